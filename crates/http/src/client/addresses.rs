//! Saved address endpoints

use super::{BloomKartClient, ClientError};
use crate::types::{Address, AddressRequest};
use bloomkart_core::validation::validators;
use reqwest::Method;

impl BloomKartClient {
    pub async fn addresses(&self) -> Result<Vec<Address>, ClientError> {
        let req = self.request(Method::GET, "/addresses");
        self.execute(req).await
    }

    pub async fn add_address(&self, address: &AddressRequest) -> Result<Address, ClientError> {
        validate_address(address)?;
        let req = self.request(Method::POST, "/addresses").json(address);
        self.execute(req).await
    }

    pub async fn update_address(
        &self,
        id: i64,
        address: &AddressRequest,
    ) -> Result<Address, ClientError> {
        validate_address(address)?;
        let req = self
            .request(Method::PUT, &format!("/addresses/{id}"))
            .json(address);
        self.execute(req).await
    }

    pub async fn delete_address(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/addresses/{id}"));
        self.execute_empty(req).await
    }

    pub async fn set_default_address(&self, id: i64) -> Result<Address, ClientError> {
        let req = self.request(Method::PUT, &format!("/addresses/{id}/default"));
        self.execute(req).await
    }
}

fn validate_address(address: &AddressRequest) -> Result<(), ClientError> {
    validators::validate_not_empty(&address.full_name, "fullName")?;
    validators::validate_phone(&address.phone_number, "phoneNumber")?;
    validators::validate_not_empty(&address.address_line1, "addressLine1")?;
    validators::validate_not_empty(&address.city, "city")?;
    validators::validate_postal_code(&address.postal_code, "postalCode")?;
    Ok(())
}
