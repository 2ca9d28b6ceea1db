//! Wire-level traits for the two registries this daemon reconciles.
//!
//! These traits are the abstract interface SPEC_FULL.md §1 calls out as the
//! seam between the reconciliation engine and the concrete registries: the
//! adapters in `crate::adapter` are written entirely against
//! [`eureka::EurekaWireClient`] and [`aws::AwsWireClient`], never against
//! `reqwest` or the AWS SDK directly.

pub mod aws;
pub mod eureka;

pub use aws::{
    AwsInstanceSummary, AwsNamespaceInfo, AwsServiceSummary, AwsWireClient, CloudMapClient,
    CreateServiceInput, CreateServiceOutcome,
};
pub use eureka::{
    EurekaApplication, EurekaHttpClient, EurekaInstance, EurekaInstanceRegistration,
    EurekaWireClient,
};
