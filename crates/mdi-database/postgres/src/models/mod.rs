pub mod instrument;
pub mod job;
pub mod price;
pub mod quality;

pub use instrument::{Exchange, Instrument, NewInstrument};
pub use job::{EtlJob, JobCounterColumns, JobDetail, NewEtlJob, NewJobDetail};
pub use price::{NewPriceRow, PriceRow};
pub use quality::{NewQualityVerdict, QualityVerdictRow};
