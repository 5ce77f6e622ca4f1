//! `watch`: runs the list poller, and optionally one detail poller, in the
//! foreground and folds the realtime feed into local lists until Ctrl-C.
//! Pipeline row changes reload the list poller, so launches made from
//! another process start it again.

use std::time::Duration;

use futures::StreamExt;
use leadflow_core::{ChangeEvent, Contact, IcebreakerStats, LiveCollection, UnresolvedLead};
use leadflow_db::{DbError, RowChange};
use leadflow_sync::{DetailPoller, SyncEngine, SyncStatus};
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Lists folded from the change feed.
struct Feeds {
    pipeline_id: Option<Uuid>,
    contacts: LiveCollection<Contact>,
    unresolved: LiveCollection<UnresolvedLead>,
}

impl Feeds {
    async fn load(pool: &sqlx::PgPool, pipeline_id: Option<Uuid>) -> Result<Self, DbError> {
        let contacts = match pipeline_id {
            Some(id) => leadflow_db::list_contacts(pool, id).await?,
            None => Vec::new(),
        };
        Ok(Self {
            pipeline_id,
            contacts: LiveCollection::from_items(contacts),
            unresolved: LiveCollection::from_items(leadflow_db::list_unresolved_leads(pool).await?),
        })
    }

    async fn fold(&mut self, pool: &sqlx::PgPool, change: &RowChange) -> Result<(), DbError> {
        if let Some(pipeline_id) = self.pipeline_id {
            let event = leadflow_db::resolve_contact_change(pool, change, pipeline_id).await?;
            if let Some(event) = event {
                println!("{}", describe_contact(&event));
                self.contacts.apply(event);
                println!("  {} contact(s) in pipeline", self.contacts.len());
            }
        }
        if let Some(event) = leadflow_db::resolve_unresolved_lead_change(pool, change).await? {
            println!("{}", describe_unresolved(&event));
            self.unresolved.apply(event);
            println!("  {} unresolved lead(s) awaiting review", self.unresolved.len());
        }
        Ok(())
    }
}

fn describe_contact(event: &ChangeEvent<Contact>) -> String {
    let name = |c: &Contact| c.display_name().unwrap_or_else(|| c.id.to_string());
    match event {
        ChangeEvent::Insert(contact) => format!("+ contact {}", name(contact)),
        ChangeEvent::Update(contact) => {
            let icebreaker = if contact.icebreaker.is_some() {
                " (icebreaker ready)"
            } else {
                ""
            };
            format!("~ contact {}{icebreaker}", name(contact))
        }
        ChangeEvent::Delete(id) => format!("- contact {id}"),
    }
}

fn describe_unresolved(event: &ChangeEvent<UnresolvedLead>) -> String {
    let name = |l: &UnresolvedLead| l.full_name.clone().unwrap_or_else(|| format!("#{}", l.id));
    match event {
        ChangeEvent::Insert(lead) => format!("+ unresolved reply from {}", name(lead)),
        ChangeEvent::Update(lead) => format!("~ unresolved reply from {}", name(lead)),
        ChangeEvent::Delete(id) => format!("- unresolved reply #{id} resolved"),
    }
}

fn describe_stats(stats: &IcebreakerStats) -> String {
    format!(
        "icebreakers: {}/{} generated ({}%) network post {}, deep search {}, generic {}",
        stats.generated(),
        stats.total,
        stats.percent(stats.generated()),
        stats.network_post,
        stats.deep_search,
        stats.generic,
    )
}

fn describe_status(status: &SyncStatus) -> String {
    format!(
        "sync {:?}: {} tracked, {} generating leads",
        status.state, status.tracked, status.active
    )
}

/// Waits for the next stats update; `None` once the detail poller is done.
async fn next_stats(rx: &mut Option<watch::Receiver<IcebreakerStats>>) -> Option<IcebreakerStats> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

/// Follow pipelines until interrupted.
///
/// # Errors
///
/// Returns an error if the initial loads fail, the pipeline does not exist,
/// or the change feed cannot be subscribed.
pub(crate) async fn run_watch(
    pool: &sqlx::PgPool,
    config: &leadflow_core::AppConfig,
    pipeline_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let list_interval = Duration::from_millis(config.list_poll_interval_ms);
    let engine = SyncEngine::new(pool.clone(), list_interval);
    engine.start().await?;
    let mut completions = engine.subscribe();
    let mut last_status = engine.status();
    println!("{}", describe_status(&last_status));

    let mut detail = match pipeline_id {
        Some(id) => {
            let interval = Duration::from_millis(config.detail_poll_interval_ms);
            let poller = DetailPoller::start(pool.clone(), id, interval).await?;
            println!("{}", describe_stats(&poller.stats()));
            Some(poller)
        }
        None => None,
    };
    let mut stats = detail
        .as_ref()
        .filter(|poller| poller.is_running())
        .map(DetailPoller::subscribe);

    let mut feeds = Feeds::load(pool, pipeline_id).await?;
    let changes = leadflow_db::listen_for_changes(pool).await?;
    tokio::pin!(changes);

    let mut status_tick = tokio::time::interval(list_interval);
    status_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                println!("interrupted");
                break;
            }
            completed = completions.recv() => match completed {
                Ok(pipeline) => println!("* pipeline {} ({}) completed", pipeline.name, pipeline.id),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "completion notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
            latest = next_stats(&mut stats) => match latest {
                Some(latest) => println!("{}", describe_stats(&latest)),
                None => {
                    println!("pipeline completed, detail polling finished");
                    stats = None;
                }
            },
            change = changes.next() => match change {
                Some(Ok(change)) => {
                    if let Err(error) = engine.handle_change(&change).await {
                        tracing::warn!(error = %error, "reload after pipeline change failed");
                    }
                    if let Err(error) = feeds.fold(pool, &change).await {
                        tracing::warn!(error = %error, "failed to apply change notification");
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!(error = %error, "invalid change notification");
                }
                None => {
                    tracing::warn!("change feed closed");
                    break;
                }
            },
            _ = status_tick.tick() => {
                let status = engine.status();
                if status != last_status {
                    println!("{}", describe_status(&status));
                    last_status = status;
                }
            }
        }
    }

    engine.stop();
    if let Some(poller) = detail.as_mut() {
        poller.stop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn contact(full_name: &str, icebreaker: Option<&str>) -> Contact {
        serde_json::from_value(json!({
            "id": "0b7f3c8e-1f1e-4a7c-9d55-3c2a9e6b1f40",
            "pipeline_id": "5b0c7a0e-3c1d-4e55-9f8a-2f5e1d9c4b21",
            "full_name": full_name,
            "icebreaker": icebreaker,
            "created_at": "2025-03-01T10:30:00Z"
        }))
        .expect("contact json")
    }

    #[test]
    fn contact_events_are_described() {
        assert_eq!(
            describe_contact(&ChangeEvent::Insert(contact("Lena Roux", None))),
            "+ contact Lena Roux"
        );
        assert_eq!(
            describe_contact(&ChangeEvent::Update(contact("Lena Roux", Some("Loved your talk")))),
            "~ contact Lena Roux (icebreaker ready)"
        );
        let id = Uuid::nil();
        assert_eq!(
            describe_contact(&ChangeEvent::Delete(id)),
            format!("- contact {id}")
        );
    }

    #[test]
    fn unresolved_events_fall_back_to_the_id() {
        let lead = UnresolvedLead {
            id: 12,
            full_name: None,
            company: None,
            reply_source: None,
            reply_html: None,
            profile_url: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            describe_unresolved(&ChangeEvent::Insert(lead)),
            "+ unresolved reply from #12"
        );
        assert_eq!(
            describe_unresolved(&ChangeEvent::Delete(12)),
            "- unresolved reply #12 resolved"
        );
    }

    #[test]
    fn stats_line_reports_generated_share() {
        let stats = IcebreakerStats {
            total: 4,
            network_post: 1,
            deep_search: 1,
            generic: 1,
            pending: 1,
        };
        assert_eq!(
            describe_stats(&stats),
            "icebreakers: 3/4 generated (75%) network post 1, deep search 1, generic 1"
        );
    }

    #[tokio::test]
    async fn finished_poller_yields_none() {
        let (tx, rx) = watch::channel(IcebreakerStats::default());
        let mut rx = Some(rx);

        tx.send_replace(IcebreakerStats {
            total: 1,
            ..IcebreakerStats::default()
        });
        assert_eq!(next_stats(&mut rx).await.map(|s| s.total), Some(1));

        drop(tx);
        assert!(next_stats(&mut rx).await.is_none());
    }
}
