//! Core business logic - framework-agnostic ambassador, discount code, usage and
//! reporting operations. The web layer only ever calls into these modules.

/// Partners, the ambassador flag and owned discount codes
pub mod ambassador;
/// Bounded TTL cache for aggregated statistics
pub mod cache;
/// Injectable time source
pub mod clock;
/// Discount codes, owners and ambassador sets
pub mod discount_code;
/// CSV rendering of reports
pub mod export;
/// Invariant checks run inside mutation transactions
pub mod guard;
/// Per-code reports assembled from the statistics service
pub mod report;
/// Monthly usage aggregation and the statistics service
pub mod stats;
/// Usage record creation and lifecycle
pub mod usage;
