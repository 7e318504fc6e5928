//! Order and payment endpoints

use super::{BloomKartClient, ClientError};
use crate::types::{
    CreateOrderRequest, DeliveryDetails, Order, OrderItemRequest, PaymentVerification,
    RefundRequest,
};
use bloomkart_core::CartStore;
use bloomkart_core::validation::validators;
use reqwest::Method;
use serde_json::Value as JsonValue;

impl CreateOrderRequest {
    /// Build an order from the current cart contents
    ///
    /// The total includes the cart's delivery fee.
    pub fn from_cart(cart: &CartStore, delivery_details: DeliveryDetails) -> Result<Self, ClientError> {
        let items = cart.items()?;
        if items.is_empty() {
            return Err(ClientError::Validation("cart is empty".into()));
        }
        Ok(Self {
            delivery_details,
            items: items.iter().map(OrderItemRequest::from).collect(),
            total_amount: cart.total()?,
        })
    }
}

impl BloomKartClient {
    pub async fn orders(&self) -> Result<Vec<Order>, ClientError> {
        let req = self.request(Method::GET, "/orders");
        self.execute(req).await
    }

    pub async fn order(&self, id: i64) -> Result<Order, ClientError> {
        let req = self.request(Method::GET, &format!("/orders/{id}"));
        self.execute(req).await
    }

    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<Order, ClientError> {
        let details = &order.delivery_details;
        validators::validate_not_empty(&details.address, "address")?;
        validators::validate_not_empty(&details.city, "city")?;
        validators::validate_postal_code(&details.pincode, "pincode")?;
        validators::validate_phone(&details.phone_number, "phoneNumber")?;

        let req = self.request(Method::POST, "/orders").json(order);
        self.execute(req).await
    }

    /// Place an order for everything in the cart
    ///
    /// The cart is left untouched; clear it once payment is confirmed.
    pub async fn place_order_from_cart(
        &self,
        cart: &CartStore,
        delivery_details: DeliveryDetails,
    ) -> Result<Order, ClientError> {
        let order = CreateOrderRequest::from_cart(cart, delivery_details)?;
        self.create_order(&order).await
    }

    /// Forward a payment confirmation for server-side signature verification
    pub async fn verify_payment(
        &self,
        verification: &PaymentVerification,
    ) -> Result<JsonValue, ClientError> {
        let req = self
            .request(Method::POST, "/orders/verify-payment")
            .json(verification);
        self.execute(req).await
    }

    pub async fn payment_status(&self, order_id: i64) -> Result<JsonValue, ClientError> {
        let req = self.request(Method::GET, &format!("/orders/{order_id}/payment-status"));
        self.execute(req).await
    }

    pub async fn request_refund(
        &self,
        order_id: i64,
        refund: &RefundRequest,
    ) -> Result<JsonValue, ClientError> {
        let req = self
            .request(Method::POST, &format!("/orders/{order_id}/refund"))
            .json(refund);
        self.execute(req).await
    }

    pub async fn payment_history(&self) -> Result<Vec<JsonValue>, ClientError> {
        let req = self.request(Method::GET, "/payment-history");
        self.execute(req).await
    }
}
