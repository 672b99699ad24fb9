//! Concurrent parsing of the activity page into ordered server updates.
//!
//! Every `div.timeline-item` block is parsed on its own task. Inside a block,
//! a fixed pool of [`ITEM_WORKERS`] tasks pulls item lines from a shared queue
//! and runs the extraction rules on them. Results land in index-addressed
//! slots, so item order follows the document no matter which worker finishes
//! first.

use std::sync::{Arc, LazyLock};

use rosbot_shared::{LegendaryItem, Result, RosbotError, ServerUpdate};
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::extract::{extract_item_markup, parse_timestamp};

/// Worker tasks per update block.
pub const ITEM_WORKERS: usize = 4;

static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.timeline-item").expect("block selector"));

static DATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.date").expect("date selector"));

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.m-b-xs").expect("item selector"));

/// Item lines waiting for a worker, tagged with their position in the block.
type ItemQueue = Arc<Mutex<std::iter::Enumerate<std::vec::IntoIter<String>>>>;

// ---------------------------------------------------------------------------
// Page level
// ---------------------------------------------------------------------------

/// Parse every update block of the page.
///
/// Waits for all blocks and items; the result is sorted ascending by
/// timestamp, equal timestamps keeping document order. When `cancel` fires
/// first, outstanding tasks are aborted and [`RosbotError::Cancelled`] is
/// returned instead of a partial list.
#[instrument(skip_all, fields(markup_len = markup.len()))]
pub async fn parse_updates(markup: &str, cancel: &CancellationToken) -> Result<Vec<ServerUpdate>> {
    // `Html` is not `Send`; blocks travel to their tasks as markup.
    let blocks = split_blocks(markup);
    let block_count = blocks.len();

    info!(blocks = block_count, "parsing update blocks");

    let mut tasks = JoinSet::new();
    for (index, block) in blocks.into_iter().enumerate() {
        let cancel = cancel.clone();
        tasks.spawn(async move { (index, parse_block(block, cancel).await) });
    }

    let mut slots: Vec<Option<ServerUpdate>> = (0..block_count).map(|_| None).collect();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                info!("parsing cancelled");
                return Err(RosbotError::Cancelled);
            }
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((index, Ok(update)))) => slots[index] = Some(update),
                Some(Ok((_, Err(e)))) => return Err(e),
                Some(Err(e)) => {
                    return Err(RosbotError::parse(format!("update block task failed: {e}")));
                }
            }
        }
    }

    let mut updates: Vec<ServerUpdate> = slots.into_iter().flatten().collect();
    // Stable: ties stay in document order.
    updates.sort_by_key(|update| update.server_timestamp);

    info!(
        updates = updates.len(),
        items = updates.iter().map(|u| u.items.len()).sum::<usize>(),
        "parsing completed"
    );

    Ok(updates)
}

/// Outer HTML of every update block, in document order.
fn split_blocks(markup: &str) -> Vec<String> {
    let doc = Html::parse_document(markup);
    doc.select(&BLOCK_SEL).map(|block| block.html()).collect()
}

// ---------------------------------------------------------------------------
// Block level
// ---------------------------------------------------------------------------

/// Date text and item lines of one block, read before any task is spawned.
struct BlockParts {
    date_text: String,
    items: Vec<String>,
}

fn read_block(markup: &str) -> BlockParts {
    let doc = Html::parse_fragment(markup);

    let date_text = doc
        .select(&DATE_SEL)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let items = doc.select(&ITEM_SEL).map(|el| el.html()).collect();

    BlockParts { date_text, items }
}

async fn parse_block(markup: String, cancel: CancellationToken) -> Result<ServerUpdate> {
    let BlockParts { date_text, items } = read_block(&markup);
    let server_timestamp = parse_timestamp(&date_text);
    let item_count = items.len();

    debug!(%server_timestamp, items = item_count, "parsing block");

    let queue: ItemQueue = Arc::new(Mutex::new(items.into_iter().enumerate()));
    let mut workers = JoinSet::new();
    for _ in 0..ITEM_WORKERS {
        workers.spawn(item_worker(queue.clone(), cancel.clone()));
    }

    let mut slots: Vec<Option<LegendaryItem>> = (0..item_count).map(|_| None).collect();
    while let Some(joined) = workers.join_next().await {
        let found = joined.map_err(|e| RosbotError::parse(format!("item worker failed: {e}")))?;
        for (index, item) in found {
            slots[index] = Some(item);
        }
    }

    if cancel.is_cancelled() {
        return Err(RosbotError::Cancelled);
    }

    let items: Vec<LegendaryItem> = slots.into_iter().flatten().collect();
    debug!(kept = items.len(), dropped = item_count - items.len(), "block parsed");

    Ok(ServerUpdate {
        items,
        server_timestamp,
    })
}

/// Pull item lines until the queue is drained or parsing is cancelled.
async fn item_worker(queue: ItemQueue, cancel: CancellationToken) -> Vec<(usize, LegendaryItem)> {
    let mut found = Vec::new();

    while !cancel.is_cancelled() {
        let next = queue.lock().await.next();
        let Some((index, markup)) = next else {
            break;
        };

        // Lines below legendary quality yield nothing and are dropped.
        if let Some(item) = extract_item_markup(&markup) {
            found.push((index, item));
        }
    }

    found
}
