mod client;
mod provider;

pub use provider::{AzureDevOpsProvider, LeadTimeSource, RestoreSource};
