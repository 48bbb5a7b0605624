//! Procurement domain module (purchase requisitions).
//!
//! Business rules for raising and deciding requisitions, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod requisition;

pub use requisition::{
    pr_number, Decision, RaiseRequisition, Requisition, RequisitionDraft, RequisitionItem,
    RequisitionStatus,
};
