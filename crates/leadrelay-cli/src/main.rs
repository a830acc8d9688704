use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadrelay_core::app::use_cases::{ChangeLeadStatus, ChangeLeadStatusArgs, GetClinicById};
use leadrelay_core::app::{ApiResponse, LeadNotifier};
use leadrelay_core::config::RelayConfig;
use leadrelay_core::domain::{
    ClinicDto, ClinicId, ClinicSource, LeadAction, LeadDto, LeadEvent, LeadId, LeadStatus,
};
use leadrelay_core::impls::{
    DeliveredMessage, InMemoryClinicRepository, InMemoryLeadRepository, InMemoryMessageQueue,
    PooledRepository,
};
use leadrelay_core::ports::{Clock, MessageQueuePort, SystemClock};

/// `LEADRELAY_QUEUE_URL` の SQS FIFO キュー。認証情報とリージョンは AWS の標準チェーンから読む。
#[cfg(feature = "sqs")]
async fn sqs_queue(queue_url: &str) -> Arc<dyn MessageQueuePort> {
    use leadrelay_core::impls::{AwsSqsApi, SqsFifoQueue};

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let client = aws_sdk_sqs::Client::new(&shared);
    Arc::new(SqsFifoQueue::new(AwsSqsApi::new(client), queue_url))
}

/// 送信先の queue。URL が無い、または `sqs` feature 無しのビルドならインメモリ。
async fn select_queue(
    queue_url: Option<&str>,
    memory: Arc<InMemoryMessageQueue>,
) -> Arc<dyn MessageQueuePort> {
    match queue_url {
        #[cfg(feature = "sqs")]
        Some(url) => {
            tracing::info!(queue_url = %url, "publishing to sqs");
            sqs_queue(url).await
        }
        #[cfg(not(feature = "sqs"))]
        Some(url) => {
            tracing::warn!(
                queue_url = %url,
                "built without the `sqs` feature, using the in-memory queue"
            );
            memory
        }
        None => memory,
    }
}

/// consumer 側から見えたメッセージを 1 行で出す
fn print_delivered(d: &DeliveredMessage) -> anyhow::Result<()> {
    let body = d.message.to_json().context("encode delivered message")?;
    println!(
        "#{seq} {id} group={group} dedup={dedup} body={body}",
        seq = d.sequence,
        id = d.message_id,
        group = d.group_id,
        dedup = d.deduplication_id,
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は無くてもよい
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadrelay_core=debug,leadrelay_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env().context("load configuration")?;
    tracing::info!(
        dedup_window_secs = config.dedup_window.as_secs(),
        time_bucket = %config.time_bucket,
        pool_size = config.pool_size,
        "starting leadrelay demo"
    );

    // (A) 共有クライアントは起動時に 1 度だけ作って渡す
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let memory = Arc::new(InMemoryMessageQueue::with_clock(
        config.dedup_window,
        clock.clone(),
    ));
    let queue = select_queue(config.queue_url.as_deref(), memory.clone()).await;
    let notifier = Arc::new(LeadNotifier::new(
        queue,
        clock.clone(),
        config.idempotency(),
        config.retry.clone(),
    ));

    let clinic_id = ClinicId::new("42")?;
    let lead_id = LeadId::new("L-7")?;

    let clinic_rows = Arc::new(InMemoryClinicRepository::default());
    clinic_rows
        .insert(ClinicDto {
            id: clinic_id.clone(),
            source: ClinicSource::Legacy,
            name: "Clínica Sorriso".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            active: true,
        })
        .await;

    let lead_rows = Arc::new(InMemoryLeadRepository::default());
    lead_rows
        .insert(LeadDto {
            id: lead_id.clone(),
            clinic_id: clinic_id.clone(),
            source: ClinicSource::Legacy,
            name: "Ana Souza".to_string(),
            status: LeadStatus::New,
            status_revision: 0,
        })
        .await;

    // use case からの repository 呼び出しはプール経由（同時実行数 = pool_size）
    let clinics = Arc::new(PooledRepository::replicate(clinic_rows, config.pool_size));
    let leads = Arc::new(PooledRepository::replicate(lead_rows, config.pool_size));

    // (B) 同じ lead-created を 2 回送る → 配送は 1 回
    let created = LeadEvent::new(
        clinic_id.clone(),
        lead_id.clone(),
        LeadAction::Created,
        clock.now(),
    )
    .with_payload(json!({ "name": "Ana Souza", "channel": "whatsapp" }));
    for _ in 0..2 {
        let options = notifier.notify(created.clone()).await?;
        tracing::info!(deduplication_id = %options.deduplication_id, "sent lead created");
    }

    // (C) ステータス変更 → 同じ group に status_changed
    let change = ChangeLeadStatus::new(leads.clone(), notifier.clone());
    let lead = change
        .execute(ChangeLeadStatusArgs {
            source: ClinicSource::Legacy,
            clinic_id: clinic_id.clone(),
            lead_id: lead_id.clone(),
            status: LeadStatus::Contacted,
        })
        .await?;
    tracing::info!(lead_id = %lead.id, status = %lead.status, "lead status changed");

    // (D) 存在しないクリニックは 404
    let get_clinic = GetClinicById::new(clinics.clone());
    let missing = ClinicId::new("999")?;
    let response = match get_clinic.execute(ClinicSource::Legacy, &missing).await {
        Ok(found) => ApiResponse::found(found, format!("clinic {missing}")),
        Err(err) => ApiResponse::from_error(&err),
    };
    println!("GET /clinics/legacy/999 -> {} {}", response.status_code, response.body);

    // (E) consumer が観測する内容（SQS に送った場合は空）
    let delivered = memory.drain().await;
    println!("delivered {} message(s):", delivered.len());
    for d in &delivered {
        print_delivered(d)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadrelay_core::domain::{DeliveryOptions, LeadQueueMessage};

    fn message() -> LeadQueueMessage {
        LeadQueueMessage::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::Created,
            json!({}),
            SystemClock.now(),
        )
    }

    #[tokio::test]
    async fn no_queue_url_publishes_in_memory() {
        let memory = Arc::new(InMemoryMessageQueue::default());
        let queue = select_queue(None, memory.clone()).await;

        queue
            .send(message(), DeliveryOptions::new("42:L-7", "42:L-7:created:x"))
            .await
            .unwrap();
        assert_eq!(memory.len().await, 1);
    }

    #[cfg(not(feature = "sqs"))]
    #[tokio::test]
    async fn queue_url_without_sqs_support_falls_back_to_memory() {
        let memory = Arc::new(InMemoryMessageQueue::default());
        let queue = select_queue(Some("https://sqs.local/leads.fifo"), memory.clone()).await;

        queue
            .send(message(), DeliveryOptions::new("42:L-7", "42:L-7:created:x"))
            .await
            .unwrap();
        assert_eq!(memory.len().await, 1);
    }
}
