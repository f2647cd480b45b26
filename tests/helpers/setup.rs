use anniv_scheduler_api::{execute, reminder::create_reminder_rule::CreateReminderRuleUseCase};
use anniv_scheduler_domain::{
    AnchorDate, AnniversaryEvent, ReminderChannel, ReminderDispatch, ReminderRuleWithSlots,
    RepeatPattern, SlotConfig, ID,
};
use anniv_scheduler_infra::{AnnivContext, INotifier, ManualSys};
use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Keeps every dispatch it accepts. Fails every dispatch while `failing` is
/// set.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<ReminderDispatch>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<ReminderDispatch> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl INotifier for RecordingNotifier {
    async fn dispatch(&self, dispatch: &ReminderDispatch) -> anyhow::Result<()> {
        // Gives a concurrent scan the chance to run while this slot is claimed
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("Notification boundary unreachable");
        }
        self.sent.lock().unwrap().push(dispatch.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub ctx: AnnivContext,
    pub sys: Arc<ManualSys>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn set_now(&self, tz: &Tz, y: i32, m: u32, d: u32, h: u32, mi: u32) {
        self.sys.set(millis(tz, y, m, d, h, mi));
    }

    pub async fn create_anniversary(
        &self,
        anchor: AnchorDate,
        repeat: RepeatPattern,
        tz: Tz,
    ) -> AnniversaryEvent {
        let anniversary = AnniversaryEvent::new(anchor, repeat, tz);
        self.ctx
            .repos
            .anniversaries
            .insert(&anniversary)
            .await
            .expect("To insert anniversary");
        anniversary
    }

    pub async fn subscribe(
        &self,
        anniversary_id: &ID,
        slots: Vec<SlotConfig>,
    ) -> ReminderRuleWithSlots {
        let usecase = CreateReminderRuleUseCase {
            anniversary_id: anniversary_id.clone(),
            user_id: ID::new(),
            channels: vec![ReminderChannel::SiteMessage, ReminderChannel::Email],
            slots,
        };
        execute(usecase, &self.ctx)
            .await
            .expect("To create reminder rule")
    }
}

/// In-memory application with a clock frozen at `now` and a recording
/// notification boundary
pub fn spawn_app(now: i64) -> TestApp {
    let mut ctx = AnnivContext::create_inmemory();
    let sys = Arc::new(ManualSys::new(now));
    let notifier = Arc::new(RecordingNotifier::default());
    ctx.sys = sys.clone();
    ctx.notifier = notifier.clone();
    TestApp { ctx, sys, notifier }
}

pub fn millis(tz: &Tz, y: i32, m: u32, d: u32, h: u32, mi: u32) -> i64 {
    tz.with_ymd_and_hms(y, m, d, h, mi, 0)
        .unwrap()
        .timestamp_millis()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn slot(offset_days: i32, h: u32, mi: u32) -> SlotConfig {
    SlotConfig::new(offset_days, NaiveTime::from_hms_opt(h, mi, 0).unwrap())
}
