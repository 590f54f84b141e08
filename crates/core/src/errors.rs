use thiserror::Error;

/// Failures that indicate broken static data or an infeasible search space.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("catalog has no category medoids to fall back on")]
    MissingMedoids,
    #[error("family rule target `{item_id}` is missing from the catalog")]
    MissingFamilyTarget { item_id: String },
    #[error("optimizer candidate grid is empty (movers {min_movers}..={max_movers}, trucks {min_trucks}..={max_trucks})")]
    EmptyCandidateGrid { min_movers: u32, max_movers: u32, min_trucks: u32, max_trucks: u32 },
}

/// Recoverable problems with a single request's input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("no items provided")]
    NoItems,
    #[error("no items could be resolved from the request")]
    NoResolvableItems,
    #[error("item `{0}` was not found in the catalog")]
    UnknownItem(String),
    #[error("invalid quantity `{value}` for `{label}`: quantities must be non-negative integers")]
    InvalidQuantity { label: String, value: String },
    #[error("item entry #{index} must be a string or an object with an `item` or `name` field")]
    MalformedItem { index: usize },
    #[error("`items` must be an object, an array, or a `name:qty, ...` string")]
    UnsupportedItemsShape,
    #[error("distance_miles must be a finite non-negative number, got {0}")]
    InvalidDistance(String),
    #[error("move_date `{0}` is not a valid YYYY-MM-DD date")]
    InvalidMoveDate(String),
    #[error("confidence_floor must be within 0..=1, got {0}")]
    InvalidConfidenceFloor(String),
    #[error("box allocation policy `{0}` must be four non-negative percentages summing to 100")]
    InvalidBoxPolicy(String),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("data source failure: {0}")]
    DataSource(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The estimator is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Input(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::DataSource(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Domain(error) => {
                Self::Internal { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
