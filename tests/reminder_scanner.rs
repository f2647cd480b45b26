mod helpers;

use anniv_scheduler_api::{
    drain_due_reminders, execute,
    reminder::{
        fire_due_reminders::FireDueRemindersUseCase,
        set_reminder_rule_enabled::SetReminderRuleEnabledUseCase,
    },
};
use anniv_scheduler_domain::{AnchorDate, LunarDate, ReminderChannel, RepeatPattern};
use chrono_tz::Asia::Shanghai;
use helpers::setup::{date, millis, slot, spawn_app};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn fires_due_slot_and_schedules_next_year() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app
        .subscribe(&anniversary.id, vec![slot(-1, 9, 0), slot(0, 9, 0)])
        .await;
    let day_before = rule.slots.iter().find(|s| s.offset_days == -1).unwrap();

    app.set_now(&Shanghai, 2025, 9, 30, 9, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 1);
    assert_eq!(report.dispatched, 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].slot_id, day_before.id);
    assert_eq!(sent[0].user_id, rule.rule.user_id);
    assert_eq!(sent[0].anniversary_id, anniversary.id);
    assert_eq!(sent[0].occurrence_date, date(2025, 10, 1));
    assert_eq!(
        sent[0].channels,
        vec![ReminderChannel::SiteMessage, ReminderChannel::Email]
    );
    assert_eq!(
        sent[0].dedupe_key(),
        format!("{}:{}:2025-10-01", rule.rule.id, day_before.id)
    );

    let advanced = app
        .ctx
        .repos
        .reminder_slots
        .find(&day_before.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        advanced.next_trigger_at,
        Some(millis(&Shanghai, 2026, 9, 30, 9, 0))
    );
    assert_eq!(advanced.next_occurrence, Some(date(2026, 10, 1)));

    // Same day slot fires the next morning for the same occurrence
    app.set_now(&Shanghai, 2025, 10, 1, 9, 30);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.dispatched, 1);
    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].occurrence_date, date(2025, 10, 1));
}

#[tokio::test]
async fn concurrent_polls_dispatch_once() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;

    app.set_now(&Shanghai, 2025, 9, 30, 9, 1);
    let (first, second) = tokio::join!(
        execute(FireDueRemindersUseCase { batch_size: 10 }, &app.ctx),
        execute(FireDueRemindersUseCase { batch_size: 10 }, &app.ctx),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.dispatched + second.dispatched, 1);
    assert_eq!(first.claimed + second.claimed, 1);
    assert_eq!(app.notifier.sent().len(), 1);

    let slot_id = &rule.slots[0].id;
    let dispatches = app
        .ctx
        .repos
        .reminder_slots
        .find_dispatches(slot_id)
        .await
        .unwrap();
    assert_eq!(dispatches.len(), 1);
    let advanced = app
        .ctx
        .repos
        .reminder_slots
        .find(slot_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        advanced.next_trigger_at,
        Some(millis(&Shanghai, 2026, 9, 30, 9, 0))
    );
}

#[tokio::test]
async fn disabled_rules_are_never_claimed() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;
    execute(
        SetReminderRuleEnabledUseCase {
            rule_id: rule.rule.id.clone(),
            enabled: false,
        },
        &app.ctx,
    )
    .await
    .unwrap();

    app.set_now(&Shanghai, 2025, 10, 2, 0, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn failed_dispatch_leaves_slot_due() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;
    let slot_id = &rule.slots[0].id;

    app.notifier.set_failing(true);
    app.set_now(&Shanghai, 2025, 9, 30, 9, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.dispatched, 0);

    let unchanged = app
        .ctx
        .repos
        .reminder_slots
        .find(slot_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, rule.slots[0]);
    assert!(app
        .ctx
        .repos
        .reminder_slots
        .find_dispatches(slot_id)
        .await
        .unwrap()
        .is_empty());

    // Retried on the next poll once the boundary is back
    app.notifier.set_failing(false);
    app.set_now(&Shanghai, 2025, 9, 30, 9, 1);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.dispatched, 1);
    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].occurrence_date, date(2025, 10, 1));
    assert_eq!(sent[0].scheduled_at, millis(&Shanghai, 2025, 9, 30, 9, 0));
}

#[tokio::test]
async fn single_occurrence_is_exhausted_after_firing() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2025, 10, 1)),
            RepeatPattern::None,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;

    app.set_now(&Shanghai, 2025, 9, 30, 9, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.exhausted, 1);

    let exhausted = app
        .ctx
        .repos
        .reminder_slots
        .find(&rule.slots[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(exhausted.is_exhausted());

    app.set_now(&Shanghai, 2030, 1, 1, 0, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 0);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn slot_created_after_its_trigger_waits_for_next_cycle() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 30, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;
    assert_eq!(
        rule.slots[0].next_trigger_at,
        Some(millis(&Shanghai, 2026, 9, 30, 9, 0))
    );

    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 0);
}

#[tokio::test]
async fn positive_offset_fires_for_yesterdays_occurrence() {
    let app = spawn_app(millis(&Shanghai, 2025, 10, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 9, 30)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(1, 20, 0)]).await;
    assert_eq!(rule.slots[0].next_occurrence, Some(date(2025, 9, 30)));

    app.set_now(&Shanghai, 2025, 10, 1, 20, 0);
    drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].occurrence_date, date(2025, 9, 30));
}

#[tokio::test]
async fn lunar_yearly_follows_the_lunar_calendar() {
    let app = spawn_app(millis(&Shanghai, 2025, 1, 1, 0, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Lunar(LunarDate::new(2024, 8, 15, false).unwrap()),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(0, 8, 0)]).await;
    assert_eq!(rule.slots[0].next_occurrence, Some(date(2025, 10, 6)));

    app.set_now(&Shanghai, 2025, 10, 6, 8, 0);
    drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(app.notifier.sent()[0].occurrence_date, date(2025, 10, 6));

    let advanced = app
        .ctx
        .repos
        .reminder_slots
        .find(&rule.slots[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(advanced.next_occurrence, Some(date(2026, 9, 25)));
    assert_eq!(
        advanced.next_trigger_at,
        Some(millis(&Shanghai, 2026, 9, 25, 8, 0))
    );
}

#[tokio::test]
async fn orphan_slot_is_exhausted_without_dispatch() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let rule = app.subscribe(&anniversary.id, vec![slot(-1, 9, 0)]).await;
    app.ctx
        .repos
        .anniversaries
        .delete(&anniversary.id)
        .await
        .unwrap();

    app.set_now(&Shanghai, 2025, 9, 30, 9, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.dispatched, 0);
    assert!(app.notifier.sent().is_empty());
    let slot = app
        .ctx
        .repos
        .reminder_slots
        .find(&rule.slots[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(slot.is_exhausted());
}

#[tokio::test]
async fn backlog_is_drained_in_batches() {
    let mut app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    app.ctx.config.claim_batch_size = 2;
    let anniversary = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    app.subscribe(&anniversary.id, (0..5).map(|m| slot(-1, 9, m)).collect())
        .await;

    app.set_now(&Shanghai, 2025, 9, 30, 10, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 5);
    assert_eq!(report.dispatched, 5);
    assert_eq!(app.notifier.sent().len(), 5);
}

#[tokio::test]
async fn unreadable_anniversary_does_not_block_the_batch() {
    let app = spawn_app(millis(&Shanghai, 2025, 9, 1, 12, 0));
    let gone = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2020, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let healthy = app
        .create_anniversary(
            AnchorDate::Gregorian(date(2021, 10, 1)),
            RepeatPattern::Yearly,
            Shanghai,
        )
        .await;
    let gone_rule = app.subscribe(&gone.id, vec![slot(-1, 9, 0)]).await;
    let healthy_rule = app.subscribe(&healthy.id, vec![slot(-1, 9, 0)]).await;
    app.ctx.repos.anniversaries.delete(&gone.id).await.unwrap();

    app.set_now(&Shanghai, 2025, 9, 30, 9, 0);
    let report = drain_due_reminders(&app.ctx, &CancellationToken::new()).await;
    assert_eq!(report.claimed, 2);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.failed, 0);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].anniversary_id, healthy.id);

    let slots = &app.ctx.repos.reminder_slots;
    let skipped = slots.find(&gone_rule.slots[0].id).await.unwrap().unwrap();
    assert!(skipped.is_exhausted());
    let advanced = slots.find(&healthy_rule.slots[0].id).await.unwrap().unwrap();
    assert_eq!(
        advanced.next_trigger_at,
        Some(millis(&Shanghai, 2026, 9, 30, 9, 0))
    );
}
