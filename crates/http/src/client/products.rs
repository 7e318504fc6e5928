//! Catalog endpoints

use super::{BloomKartClient, ClientError};
use crate::types::{Page, Product, ProductQuery};
use reqwest::Method;

impl BloomKartClient {
    /// One page of the catalog, filtered by `query`
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ClientError> {
        let req = self
            .request(Method::GET, "/products")
            .query(&query.to_pairs());
        self.execute(req).await
    }

    pub async fn product(&self, id: i64) -> Result<Product, ClientError> {
        let req = self.request(Method::GET, &format!("/products/{id}"));
        self.execute(req).await
    }

    pub async fn product_categories(&self) -> Result<Vec<String>, ClientError> {
        let req = self.request(Method::GET, "/products/categories");
        self.execute(req).await
    }

    pub async fn featured_products(&self) -> Result<Vec<Product>, ClientError> {
        let req = self.request(Method::GET, "/products/featured");
        self.execute(req).await
    }
}
