use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use nexgen_core::{DomainError, DomainResult, Entity, RequisitionId};

/// Purchase requisition status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequisitionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequisitionStatus::Pending => "pending",
            RequisitionStatus::Approved => "approved",
            RequisitionStatus::Rejected => "rejected",
        }
    }

    /// Parse the stored column value.
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "pending" => Ok(RequisitionStatus::Pending),
            "approved" => Ok(RequisitionStatus::Approved),
            "rejected" => Ok(RequisitionStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown requisition status: {other}"))),
        }
    }
}

impl core::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested line. Only the count and total survive on the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionItem {
    pub name: String,
    pub qty: i64,
    pub price: f64,
}

impl RequisitionItem {
    pub fn line_total(&self) -> f64 {
        self.qty as f64 * self.price
    }
}

/// Command: RaiseRequisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaiseRequisition {
    pub dept: String,
    pub items: Vec<RequisitionItem>,
}

impl RaiseRequisition {
    pub fn validate(&self) -> DomainResult<()> {
        if self.dept.trim().is_empty() {
            return Err(DomainError::validation("dept cannot be empty"));
        }
        if self.items.is_empty() {
            return Err(DomainError::validation("a requisition needs at least one item"));
        }
        for (idx, item) in self.items.iter().enumerate() {
            if item.qty <= 0 {
                return Err(DomainError::validation(format!("item {idx}: qty must be positive")));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(DomainError::validation(format!("item {idx}: price must be non-negative")));
            }
        }
        if !self.total_amount().is_finite() {
            return Err(DomainError::validation("total amount is out of range"));
        }
        Ok(())
    }

    /// Σ qty·price, rounded to cents.
    pub fn total_amount(&self) -> f64 {
        let total: f64 = self.items.iter().map(RequisitionItem::line_total).sum();
        (total * 100.0).round() / 100.0
    }

    /// Validate and turn into an insertable row for `requested_by`.
    pub fn into_draft(self, requested_by: impl Into<String>, created_on: NaiveDate) -> DomainResult<RequisitionDraft> {
        self.validate()?;
        Ok(RequisitionDraft {
            requested_by: requested_by.into(),
            dept: self.dept.trim().to_string(),
            amount: self.total_amount(),
            items: self.items.len() as i32,
            created_on,
        })
    }
}

/// Row waiting for its number. Stores assign `pr_number` and `id` at insert.
#[derive(Debug, Clone, PartialEq)]
pub struct RequisitionDraft {
    pub requested_by: String,
    pub dept: String,
    pub amount: f64,
    pub items: i32,
    pub created_on: NaiveDate,
}

impl RequisitionDraft {
    pub fn into_requisition(self, id: RequisitionId, sequence: u32) -> Requisition {
        Requisition {
            id,
            pr_number: pr_number(self.created_on, sequence),
            requested_by: self.requested_by,
            dept: self.dept,
            amount: self.amount,
            items: self.items,
            status: RequisitionStatus::Pending,
            created_at: self.created_on,
        }
    }
}

/// `PR-{year}-{sequence:04}`; `sequence` is 1-based within the year.
pub fn pr_number(date: NaiveDate, sequence: u32) -> String {
    format!("PR-{}-{:04}", date.year(), sequence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub const fn target(self) -> RequisitionStatus {
        match self {
            Decision::Approve => RequisitionStatus::Approved,
            Decision::Reject => RequisitionStatus::Rejected,
        }
    }

    /// Response message, e.g. "PR approved".
    pub const fn message(self) -> &'static str {
        match self {
            Decision::Approve => "PR approved",
            Decision::Reject => "PR rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub pr_number: String,
    pub requested_by: String,
    pub dept: String,
    pub amount: f64,
    pub items: i32,
    pub status: RequisitionStatus,
    pub created_at: NaiveDate,
}

impl Requisition {
    /// Status after applying `decision`. Only pending requisitions can be decided.
    pub fn decide(&self, decision: Decision) -> DomainResult<RequisitionStatus> {
        match self.status {
            RequisitionStatus::Pending => Ok(decision.target()),
            other => Err(DomainError::invariant(format!(
                "requisition {} is already {other}",
                self.pr_number
            ))),
        }
    }
}

impl Entity for Requisition {
    type Id = RequisitionId;

    fn id(&self) -> RequisitionId {
        self.id
    }
}
