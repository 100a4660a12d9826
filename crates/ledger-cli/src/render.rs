use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use powledger_core::{Block, Ledger};
use serde::Serialize;

const SHORT_HASH: usize = 12;

/// Counts chars, not bytes: a tampered `prev_hash` can hold any text.
fn short(hash: &str) -> String {
    match hash.char_indices().nth(SHORT_HASH) {
        Some((cut, _)) => format!("{}…", &hash[..cut]),
        None => hash.to_string(),
    }
}

pub fn chain_table(ledger: &Ledger) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "idx", "sender", "receiver", "amount", "creator", "timestamp", "nonce", "prev",
                "hash",
            ]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for (index, block) in ledger.chain().iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(&block.record.sender),
            Cell::new(&block.record.receiver),
            Cell::new(block.record.amount),
            Cell::new(block.creator_id),
            Cell::new(&block.timestamp),
            Cell::new(block.nonce),
            Cell::new(short(&block.prev_hash)),
            Cell::new(short(&block.hash())),
        ]);
    }
    table
}

/// A block as shown by `inspect`: stored fields plus its position and hash.
#[derive(Serialize)]
pub struct BlockView<'a> {
    pub index: usize,
    pub hash: String,
    #[serde(flatten)]
    pub block: &'a Block,
}

pub fn inspect(ledger: &Ledger, index: usize) -> Option<serde_json::Result<String>> {
    ledger.get(index).map(|block| {
        serde_json::to_string_pretty(&BlockView {
            index,
            hash: block.hash(),
            block,
        })
    })
}
