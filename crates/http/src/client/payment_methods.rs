//! Saved card endpoints

use super::{BloomKartClient, ClientError};
use crate::types::{PaymentMethod, PaymentMethodRequest};
use reqwest::Method;

impl BloomKartClient {
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, ClientError> {
        let req = self.request(Method::GET, "/payment-methods");
        self.execute(req).await
    }

    pub async fn add_payment_method(
        &self,
        method: &PaymentMethodRequest,
    ) -> Result<PaymentMethod, ClientError> {
        let req = self.request(Method::POST, "/payment-methods").json(method);
        self.execute(req).await
    }

    pub async fn delete_payment_method(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/payment-methods/{id}"));
        self.execute_empty(req).await
    }
}
