pub mod provider;
pub mod sheet;

pub use provider::ScheduleProvider;
pub use sheet::SheetSchedule;
