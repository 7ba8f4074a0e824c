//! Loan renewal workflow
//!
//! A librarian holding `mark-returned` may move the due date of a copy
//! forward. Checks run in this order and stop at the first failure:
//!
//! 1. the actor holds the capability (`Authorization`),
//! 2. the copy exists (`NotFound`),
//! 3. the date, defaulting to three weeks from today, lies within
//!    `today ..= today + max_renewal_weeks` (`Validation`).
//!
//! Only then is `due_back` written, as a single-row update.

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{book_instance::today, BookInstance, Capability, UserClaims},
    repository::Repository,
};

/// Accepted renewal window, in weeks from today
#[derive(Debug, Clone, Copy)]
pub struct RenewalPolicy {
    pub default_weeks: i64,
    pub max_weeks: i64,
}

impl RenewalPolicy {
    pub fn from_config(config: &LoansConfig) -> Self {
        Self {
            default_weeks: config.default_renewal_weeks,
            max_weeks: config.max_renewal_weeks,
        }
    }

    pub fn default_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.default_weeks)
    }

    pub fn latest_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.max_weeks)
    }

    /// Both bounds are inclusive
    pub fn check(&self, date: NaiveDate, today: NaiveDate) -> AppResult<()> {
        if date < today {
            return Err(AppError::Validation(
                "Invalid date - renewal in past".to_string(),
            ));
        }
        if date > self.latest_date(today) {
            return Err(AppError::Validation(format!(
                "Invalid date - renewal more than {} weeks ahead",
                self.max_weeks
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: RenewalPolicy,
}

impl LoansService {
    pub fn new(repository: Repository, policy: RenewalPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> RenewalPolicy {
        self.policy
    }

    /// Copy to renew and the date proposed for it
    pub async fn renewal_form(
        &self,
        actor: &UserClaims,
        instance_id: Uuid,
    ) -> AppResult<(BookInstance, NaiveDate)> {
        actor.require(Capability::MarkReturned)?;

        let instance = self.repository.instances.get_by_id(instance_id).await?;
        let today = today();
        Ok((instance.with_overdue(today), self.policy.default_date(today)))
    }

    /// Move the due date of a copy; `requested` defaults to the proposed date
    pub async fn renew(
        &self,
        actor: &UserClaims,
        instance_id: Uuid,
        requested: Option<NaiveDate>,
    ) -> AppResult<BookInstance> {
        self.renew_on(actor, instance_id, requested, today()).await
    }

    async fn renew_on(
        &self,
        actor: &UserClaims,
        instance_id: Uuid,
        requested: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<BookInstance> {
        actor.require(Capability::MarkReturned)?;

        let instance = self.repository.instances.get_by_id(instance_id).await?;
        let due_back = requested.unwrap_or_else(|| self.policy.default_date(today));
        self.policy.check(due_back, today)?;

        let renewed = self
            .repository
            .instances
            .set_due_back(instance.id, due_back)
            .await?;

        tracing::info!(
            "Copy {} renewed by {}: {:?} -> {}",
            renewed.id,
            actor.sub,
            instance.due_back,
            due_back
        );
        Ok(renewed.with_overdue(today))
    }
}
