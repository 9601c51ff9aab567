//! turfcheck - Upload turf photos and track their condition analysis
//!
//! turfcheck is a client for the turf inspection backend. It uploads images,
//! asks the backend to analyze them, and polls for the results, classifying
//! each result into a small set of conditions.
//!
//! # Workflow
//!
//! 1. **Select**: pick image files or folders ([`Session::select`]).
//! 2. **Upload**: `POST /images/upload` returns opaque asset ids.
//! 3. **Analyze**: `POST /images/analyze` queues an analysis job for the ids.
//! 4. **Poll**: `GET /images/result` is fetched once, then every second for
//!    five seconds ([`QuickPoll`]).
//!
//! Every request carries an anonymous `userId` ([`IdentityProvider`]) that is
//! created once and persisted in a local SQLite file.
//!
//! # Quick Start
//!
//! ```no_run
//! use turfcheck::{ApiClient, CancellationSource, ClientConfig, MemorySurface, Session};
//!
//! let config = ClientConfig::new();
//! let client = ApiClient::new(&config).unwrap();
//! let mut session = Session::new(client, "my-identity", &config);
//! let mut surface = MemorySurface::new();
//!
//! session.select(&["photos/"]);
//! let report = session.run(&mut surface, &CancellationSource::new().token()).unwrap();
//!
//! println!("{} fetches, {} rows", report.cycles, surface.rows.len());
//! for row in &surface.rows {
//!     println!("{} {} {}", row.image_id, row.badge.icon, row.badge.label);
//! }
//! ```
//!
//! # Conditions
//!
//! | Condition | Backend text |
//! |-----------|--------------|
//! | Good | 양호, LOW |
//! | Warn | 주의, MID, MEDIUM |
//! | Bad | 불량, 손상, 나쁨, HIGH |
//! | Unknown | anything else |
//!
//! # Modules
//!
//! - [`api`]: HTTP client and response shape normalization
//! - [`workflow`]: session state and the upload → analyze → poll sequence
//! - [`poll`]: quick poll with cancellation
//! - [`status`]: condition classification
//! - [`report`]: Output formatters (CSV, JSON, HTML)

pub mod api;
pub mod cancel;
pub mod config;
pub mod db;
pub mod identity;
pub mod poll;
pub mod report;
pub mod schema;
pub mod status;
pub mod surface;
pub mod workflow;

pub use api::{AnalyzeError, ApiClient, AssetId, Extracted, FetchError, ResultRecord, Shape, UploadError};
pub use cancel::{CancellationSource, CancellationToken};
pub use config::{ClientConfig, Contract, IdTracking, PollSchedule};
pub use db::{Database, DbError, HistoryRecord};
pub use identity::{IdentityProvider, KeyValueStore, USER_ID_KEY};
pub use poll::{PollHandle, PollReport, Poller, QuickPoll};
pub use status::{classify, Badge, Condition, ResultRow};
pub use surface::{MemorySurface, Surface, TerminalSurface};
pub use workflow::{Session, WorkflowError};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is correct and documented.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: Condition = Condition::Good;
        let _config = ClientConfig::new();
        let _surface = MemorySurface::new();
        let _ = classify("LOW");
    }

    #[test]
    fn test_condition_variants() {
        let _ = Condition::Good;
        let _ = Condition::Warn;
        let _ = Condition::Bad;
        let _ = Condition::Unknown;
    }

    #[test]
    fn test_session_constructible_from_crate_root() {
        let config = ClientConfig::new();
        let client = ApiClient::new(&config).unwrap();
        let session = Session::new(client, "id", &config);
        assert_eq!(session.identity(), "id");
        assert!(session.selected().is_empty());
    }
}
