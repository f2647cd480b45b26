mod advancer;
mod anniversary;
mod calendar;
pub mod date;
pub mod lunar;
mod projection;
mod reminder;
mod shared;
mod trigger;

pub use advancer::{Advance, Exhaustion, ReminderAdvancer};
pub use anniversary::{AnchorDate, AnchorDateError, AnniversaryEvent};
pub use calendar::CalendarType;
pub use lunar::{lunar_to_solar, solar_to_lunar, LunarDate, LunarDateError, LunarMonth};
pub use projection::{project, Projection, ProjectionHorizon};
pub use reminder::{
    ReminderChannel, ReminderDispatch, ReminderRule, ReminderRuleWithSlots, ReminderSlot,
    ScheduleError, SlotConfig, SlotSchedule,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use shared::labels::InvalidCodeError;
pub use shared::recurrence::RepeatPattern;
pub use trigger::compose;
