//! Table rendering for query, explain, ingest and collection listings.

use chrono::{DateTime, Utc};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::ingest::IngestReport;
use crate::query::PhenotypeSimilarity;
use crate::store::Neighbor;
use crate::vector::CollectionDescriptor;

fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Ranked diseases, closest first.
pub fn create_ranking_table(neighbors: &[Neighbor]) -> String {
    let mut table = styled_table(&["Rank", "Disease", "Distance"]);
    for (rank, neighbor) in neighbors.iter().enumerate() {
        table.add_row(vec![
            right((rank + 1).to_string()),
            Cell::new(neighbor.id.as_str()),
            right(format!("{:.6}", neighbor.distance)),
        ]);
    }
    table.to_string()
}

/// Per-phenotype similarity to a disease aggregate.
pub fn create_explain_table(rows: &[PhenotypeSimilarity]) -> String {
    let mut table = styled_table(&["Phenotype", "Label", "Cosine similarity"]);
    for row in rows {
        let similarity = match row.similarity {
            Some(value) => right(format!("{value:.4}")),
            None => Cell::new("no embedding")
                .fg(Color::Yellow)
                .set_alignment(CellAlignment::Right),
        };
        table.add_row(vec![
            Cell::new(row.phenotype.as_str()),
            Cell::new(row.label.as_deref().unwrap_or("")),
            similarity,
        ]);
    }
    table.to_string()
}

/// Collections with metric, dimension, size and last update.
pub fn create_collections_table(descriptors: &[CollectionDescriptor]) -> String {
    let mut table = styled_table(&["Collection", "Metric", "Dimension", "Entries", "Updated"]);
    for descriptor in descriptors {
        let dimension = descriptor
            .dimension
            .map(|d| d.get().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&descriptor.name),
            Cell::new(descriptor.metric.as_str()),
            right(dimension),
            right(descriptor.count.to_string()),
            Cell::new(format_unix_timestamp(descriptor.updated_at)),
        ]);
    }
    table.to_string()
}

/// Summary of one ingest run.
pub fn create_ingest_table(report: &IngestReport) -> String {
    let mut table = styled_table(&["Metric", "Value"]);
    let rows = [
        ("Embeddings cached", report.embeddings_cached),
        ("Embeddings skipped", report.embeddings_skipped),
        ("Diseases annotated", report.diseases),
        ("Annotations", report.annotations),
        ("Annotation rows skipped", report.annotation_rows_skipped),
        ("Phenotype vectors written", report.phenotypes_mirrored),
        ("Disease vectors committed", report.build.committed),
        ("Diseases without embeddings", report.build.skipped_empty),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), right(value.to_string())]);
    }

    let failed = report.build.failed();
    let failed_cell = right(failed.to_string());
    table.add_row(vec![
        Cell::new("Diseases failed"),
        if failed > 0 {
            failed_cell.fg(Color::Red).add_attribute(Attribute::Bold)
        } else {
            failed_cell
        },
    ]);
    table.add_row(vec![
        Cell::new("Time elapsed"),
        right(format!("{:.2}s", report.elapsed.as_secs_f64())),
    ]);
    table.to_string()
}

fn format_unix_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
