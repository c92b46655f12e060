use comfy_table::{presets::NOTHING, *};
use itertools::izip;

use coronadb::{alias::AliasTable, reconcile::ReconcileReport, world::WorldTable, COL};
use polars::frame::DataFrame;

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn count_or_blank(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn display_world(world: &WorldTable, max_results: Option<usize>) -> anyhow::Result<()> {
    let rows = match max_results {
        Some(max) => &world.rows()[..max.min(world.len())],
        None => world.rows(),
    };
    let mut table = styled_table();
    table.set_header(vec![
        bold("Country"),
        bold("Date"),
        bold("Confirmed"),
        bold("Recovered"),
        bold("Deaths"),
        bold("Datasets"),
    ]);
    for row in rows {
        table.add_row(vec![
            row.country.clone(),
            row.date().map(|d| d.to_string()).unwrap_or_default(),
            count_or_blank(row.confirmed()),
            count_or_blank(row.recovered()),
            count_or_blank(row.deaths()),
            row.datasets.to_string(),
        ]);
    }
    for idx in 2..6 {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_metadata(metadata: DataFrame, max_results: Option<usize>) -> anyhow::Result<()> {
    let df_to_show = match max_results {
        Some(max) => metadata.head(Some(max)),
        None => metadata,
    };
    let mut table = styled_table();
    table.set_header(vec![
        bold("CoronaDB ID"),
        bold("Country"),
        bold("Genbank Accession"),
    ]);
    for (cdb_id, country, accession) in izip!(
        df_to_show.column(COL::CDB_ID)?.str()?,
        df_to_show.column(COL::ISOLATION_COUNTRY)?.str()?,
        df_to_show.column(COL::GENBANK_ACCESSION)?.str()?,
    ) {
        table.add_row(vec![
            cdb_id.unwrap_or_default(),
            country.unwrap_or_default(),
            accession.unwrap_or_default(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_report(
    report: &ReconcileReport,
    aliases: &AliasTable,
    unmatched_metadata: &[String],
) -> anyhow::Result<()> {
    let mut table = styled_table();
    table
        .add_row(vec![bold("Exact matches"), report.exact_matches.into()])
        .add_row(vec![bold("Aliased matches"), report.aliased_matches.into()])
        .add_row(vec![
            bold("Dropped (no alias)"),
            report.unmapped_raw.join(", ").into(),
        ])
        .add_row(vec![
            bold("Dropped (alias shadowed)"),
            report.shadowed_aliases.join(", ").into(),
        ])
        .add_row(vec![
            bold("Countries without cases"),
            report.unmapped_reference.join(", ").into(),
        ])
        .add_row(vec![
            bold("Metadata countries unmatched"),
            unmatched_metadata.join(", ").into(),
        ]);
    for (canonical, sources) in aliases.duplicate_targets() {
        table.add_row(vec![
            bold("Alias conflict"),
            format!("{canonical} <- {}", sources.join(", ")).into(),
        ]);
    }
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);
    Ok(())
}
