pub mod batch;
pub mod domain;
pub mod error;
pub mod interpro;
pub mod output;
pub mod reconcile;
pub mod stats;
pub mod store;
pub mod table;
