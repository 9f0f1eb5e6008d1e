// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Spawnable Entities Sandbox
// Drives the manager from producer threads and drains it on the main thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use spawnable_core::{AssetUUID, Entity, GameEntityContext, Spawnable, SpawnableAsset};
use spawnable_manager::{
    BarrierOptionalArgs, CommandQueuePriority, CommandQueueStatus, DestroyTicketOptionalArgs,
    EntitySpawnTicket, ListEntitiesOptionalArgs, SpawnAllEntitiesOptionalArgs,
    SpawnEntitiesOptionalArgs, SpawnableEntitiesConfig, SpawnableEntitiesManager, TicketId,
};

const PRODUCERS: usize = 3;
const FRAME: Duration = Duration::from_millis(16);
const MAX_FRAMES: usize = 600;

fn asset_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(name)
}

/// Loads a spawnable on a background thread, the way an asset streamer would.
fn load_in_background(path: PathBuf, delay: Duration) -> SpawnableAsset {
    let asset = SpawnableAsset::loading(AssetUUID::new());
    let slot = asset.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        match Spawnable::load(&path) {
            Ok(spawnable) => {
                log::info!("Loaded '{}' ({} prototypes).", path.display(), spawnable.len());
                slot.complete(spawnable);
            }
            Err(error) => {
                log::error!("{error}");
                slot.fail(error.to_string());
            }
        }
    });
    asset
}

/// Queues a little scene against one ticket: some turret parts, the whole
/// outpost and a barrier that reports back once everything is in.
fn produce(
    manager: &SpawnableEntitiesManager,
    turret: &EntitySpawnTicket,
    outpost: &EntitySpawnTicket,
    producer: usize,
    finished: &Arc<AtomicUsize>,
) {
    manager.spawn_entities(
        turret,
        vec![0, 1, 2, 3],
        SpawnEntitiesOptionalArgs {
            completion_callback: Some(Box::new(move |ticket: TicketId, entities: &[Entity]| {
                log::info!(
                    "Producer {producer}: turret on ticket {ticket} spawned {} entities.",
                    entities.len()
                );
            })),
            ..Default::default()
        },
    );
    manager.spawn_all_entities(outpost, SpawnAllEntitiesOptionalArgs::default());

    let finished = Arc::clone(finished);
    manager.barrier(
        outpost,
        move |ticket| {
            log::info!("Producer {producer}: outpost ticket {ticket} is complete.");
            finished.fetch_add(1, Ordering::SeqCst);
        },
        BarrierOptionalArgs::default(),
    );
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config_path = asset_path("spawn_config.ron");
    let config = SpawnableEntitiesConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let turret_template = Spawnable::load(asset_path("turret.spawnable.ron"))
        .context("loading the turret template")?;

    let context = GameEntityContext::new();
    let manager = Arc::new(SpawnableEntitiesManager::with_default_cloner(
        config,
        Box::new(context.clone()),
    ));
    let config = manager.config();
    log::info!(
        "Priorities up to {} and loaded templates of up to {} prototypes go to the high priority queue.",
        config.high_priority_threshold,
        config.small_spawnable_threshold
    );

    let turret = SpawnableAsset::ready(AssetUUID::new(), turret_template);
    let outpost = load_in_background(asset_path("outpost.spawnable.ron"), Duration::from_millis(120));
    let finished = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let manager = Arc::clone(&manager);
            let turret = turret.clone();
            let outpost = outpost.clone();
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let turret_ticket = manager.create_ticket(turret);
                let outpost_ticket = manager.create_ticket(outpost);
                produce(&manager, &turret_ticket, &outpost_ticket, producer, &finished);
                (turret_ticket, outpost_ticket)
            })
        })
        .collect();

    let mut tickets = Vec::with_capacity(PRODUCERS * 2);
    for producer in producers {
        let (turret_ticket, outpost_ticket) = producer
            .join()
            .map_err(|_| anyhow::anyhow!("a producer thread panicked"))?;
        tickets.push(turret_ticket);
        tickets.push(outpost_ticket);
    }

    // Main thread: the owner of the entity container.
    let mut frames = 0;
    while finished.load(Ordering::SeqCst) < PRODUCERS {
        if frames == MAX_FRAMES {
            anyhow::bail!("spawning did not finish after {MAX_FRAMES} frames");
        }
        manager.process_queue(CommandQueuePriority::HIGH);
        manager.process_queue(CommandQueuePriority::REGULAR);
        frames += 1;
        thread::sleep(FRAME);
    }
    log::info!(
        "All producers finished after {frames} frames: {} entities alive, {} active.",
        context.len(),
        context.active_count()
    );

    if let Some(ticket) = tickets.first() {
        manager.list_entities(
            ticket,
            |ticket, entities| {
                for entity in entities {
                    log::debug!("Ticket {ticket}: {} {} -> {:?}", entity.id, entity.name, entity.references);
                }
            },
            ListEntitiesOptionalArgs::default(),
        );
    }
    for ticket in &tickets {
        manager.destroy_ticket(ticket, DestroyTicketOptionalArgs::default());
    }
    while manager.process_queue(CommandQueuePriority::ALL) == CommandQueueStatus::HasCommandsLeft {
        thread::sleep(FRAME);
    }

    let stats = manager.stats();
    log::info!(
        "Shutdown: {} entities left, {} commands queued, {} executed, {} requeued, {} discarded.",
        context.len(),
        stats.queued,
        stats.executed,
        stats.requeued,
        stats.discarded
    );
    Ok(())
}
