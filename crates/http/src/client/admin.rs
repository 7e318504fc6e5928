//! Admin endpoints
//!
//! The backend enforces the admin role; a non-admin gets `ClientError::Forbidden`.

use super::{BloomKartClient, ClientError};
use crate::types::{
    DashboardStats, Order, OrderStatusUpdate, Page, Product, RoleUpdate, UserProfile,
};
use bloomkart_core::Role;
use reqwest::Method;
use serde_json::Value as JsonValue;

impl BloomKartClient {
    pub async fn admin_dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let req = self.request(Method::GET, "/admin/dashboard/stats");
        self.execute(req).await
    }

    /// Orders across all customers, optionally filtered by status
    pub async fn admin_orders(
        &self,
        page: u32,
        size: u32,
        status: Option<&str>,
    ) -> Result<Page<Order>, ClientError> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            query.push(("status", status.to_string()));
        }
        let req = self.request(Method::GET, "/admin/orders").query(&query);
        self.execute(req).await
    }

    pub async fn admin_order(&self, id: i64) -> Result<Order, ClientError> {
        let req = self.request(Method::GET, &format!("/admin/orders/{id}"));
        self.execute(req).await
    }

    pub async fn admin_update_order_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Order, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/admin/orders/{id}/status"))
            .json(&OrderStatusUpdate {
                status: status.to_string(),
            });
        self.execute(req).await
    }

    pub async fn admin_products(&self, page: u32, size: u32) -> Result<Page<Product>, ClientError> {
        let req = self
            .request(Method::GET, "/admin/products")
            .query(&[("page", page), ("size", size)]);
        self.execute(req).await
    }

    pub async fn admin_product(&self, id: i64) -> Result<Product, ClientError> {
        let req = self.request(Method::GET, &format!("/admin/products/{id}"));
        self.execute(req).await
    }

    /// Replace a product's fields
    pub async fn admin_update_product(
        &self,
        id: i64,
        product: &JsonValue,
    ) -> Result<Product, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/admin/products/{id}"))
            .json(product);
        self.execute(req).await
    }

    pub async fn admin_delete_product(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/admin/products/{id}"));
        self.execute_empty(req).await
    }

    pub async fn admin_users(&self, page: u32, size: u32) -> Result<Page<UserProfile>, ClientError> {
        let req = self
            .request(Method::GET, "/admin/users")
            .query(&[("page", page), ("size", size)]);
        self.execute(req).await
    }

    pub async fn admin_update_user_role(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<UserProfile, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/admin/users/{user_id}/role"))
            .json(&RoleUpdate { role });
        self.execute(req).await
    }

    pub async fn admin_delete_user(&self, user_id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/admin/users/{user_id}"));
        self.execute_empty(req).await
    }
}
