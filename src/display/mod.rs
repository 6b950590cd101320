//! Terminal rendering for the CLI: styled tables and a color theme.

pub mod tables;
pub mod theme;

pub use tables::{
    create_collections_table, create_explain_table, create_ingest_table, create_ranking_table,
};
pub use theme::{THEME, Theme};
