pub mod costing;
pub mod money;
pub mod period;
pub mod pnl;
pub mod types;

pub use costing::{recipe_cost, ConcreteRecipe, RecipeCost};
pub use money::Money;
pub use period::{DateRange, ReportPeriod};
pub use pnl::{aggregate, DailyPoint, DaySum, PnlError, PnlRow, PnlTable};
pub use types::{ImportKind, JobStatus, PatternType, PriceKind, TxType};
