pub mod optimizer;
pub mod packing;
pub mod quick;
pub mod rules;

pub use optimizer::{
    Adjustment, CrewBounds, GridSearchOptimizer, ItemAllocation, LocationContext, OptimizeFor,
    OptimizedQuote, QuoteContext, QuoteOptimizer, QuoteOptions, QuoteResult, QuoteTraceStep,
};
pub use packing::{PackingCatalog, PackingCost, PackingRequest, PackingSku, PackingTier};
pub use quick::{price_quick_quote, LocationProfile, QuickQuoteResult, QuickQuoteSpec};
pub use rules::{
    AccessCode, AccessRule, AccessTable, DayBucket, LocationDescriptor, MoveType, MovingRules,
    RateCard, RateCards, RuleConstants, RulesError,
};
