//! Product review endpoints

use super::{BloomKartClient, ClientError};
use crate::types::{Review, ReviewRequest, ReviewStats};
use bloomkart_core::validation::validators;
use reqwest::Method;

impl BloomKartClient {
    pub async fn product_reviews(&self, product_id: i64) -> Result<Vec<Review>, ClientError> {
        let req = self.request(Method::GET, &format!("/reviews/product/{product_id}"));
        self.execute(req).await
    }

    pub async fn review_stats(&self, product_id: i64) -> Result<ReviewStats, ClientError> {
        let req = self.request(Method::GET, &format!("/reviews/product/{product_id}/stats"));
        self.execute(req).await
    }

    /// Whether the signed-in user already reviewed this product
    pub async fn has_reviewed(&self, product_id: i64) -> Result<bool, ClientError> {
        let req = self.request(
            Method::GET,
            &format!("/reviews/product/{product_id}/has-reviewed"),
        );
        self.execute(req).await
    }

    /// The signed-in user's review of this product, if any
    pub async fn own_review(&self, product_id: i64) -> Result<Option<Review>, ClientError> {
        let req = self.request(
            Method::GET,
            &format!("/reviews/product/{product_id}/user-review"),
        );
        match self.execute(req).await {
            Ok(review) => Ok(Some(review)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_review(
        &self,
        product_id: i64,
        review: &ReviewRequest,
    ) -> Result<Review, ClientError> {
        validate_rating(review)?;
        let req = self
            .request(Method::POST, &format!("/reviews/product/{product_id}"))
            .json(review);
        self.execute(req).await
    }

    pub async fn update_review(
        &self,
        product_id: i64,
        review: &ReviewRequest,
    ) -> Result<Review, ClientError> {
        validate_rating(review)?;
        let req = self
            .request(Method::PUT, &format!("/reviews/product/{product_id}"))
            .json(review);
        self.execute(req).await
    }

    pub async fn delete_review(&self, product_id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/reviews/product/{product_id}"));
        self.execute_empty(req).await
    }
}

fn validate_rating(review: &ReviewRequest) -> Result<(), ClientError> {
    validators::validate_range(review.rating, 1, 5, "rating")?;
    Ok(())
}
