pub mod catalog;
pub mod config;
pub mod data;
pub mod errors;
pub mod estimate;
pub mod pricing;
pub mod request;
pub mod resolver;
pub mod text;

pub use catalog::{AliasIndex, AliasPriority, AliasRecord, CatalogItem, MatchResult, Suggestion};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use data::{DataBundle, DataDigests};
pub use errors::{ApplicationError, DomainError, InputError, InterfaceError};
pub use estimate::{Estimate, EstimateBreakdown, Estimator, InventoryLine, QuickQuote};
pub use pricing::{
    GridSearchOptimizer, LocationDescriptor, LocationProfile, MovingRules, PackingCatalog,
    QuoteOptimizer, QuoteResult,
};
pub use request::{EstimateRequest, QuickQuoteRequest, RequestOptions};
pub use resolver::{
    Assumption, DeterministicInventoryResolver, InventoryResolver, ItemTally, ResolvedLine,
    ResolverOptions, ResolverResult,
};
