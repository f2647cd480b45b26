mod telemetry;

use anniv_scheduler_api::Application;
use anniv_scheduler_infra::{run_migration, setup_context};
use telemetry::{get_subscriber, init_subscriber};
use tracing::error;

#[tokio::main]
async fn main() {
    let subscriber = get_subscriber("anniv_scheduler".into(), "info".into());
    init_subscriber(subscriber);

    run_migration()
        .await
        .expect("Database migrations to succeed");
    let context = setup_context().await;

    let app = Application::new(context);
    app.listen_for_shutdown_signals()
        .expect("Shutdown signal handlers to register");

    if let Err(e) = app.start().await {
        error!("Reminder scanner crashed. Error: {:?}", e);
    }
}
