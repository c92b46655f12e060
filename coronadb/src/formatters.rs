use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use geo::geometry::Geometry;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value;
use std::io::Write;
use wkt::TryFromWkt;

use crate::COL;

/// Utility function to convert from polars `AnyValue` to `serde_json::Value`
/// Doesn't cover all types but the ones found in the world and series tables.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        AnyValue::Date(_) => Ok(json!(value.to_string())),
        _ => Err(anyhow!("Failed to convert type")),
    }
}

/// Build one GeoJSON feature per row with a geometry, every other column becoming a property
fn features(df: &DataFrame) -> Result<Vec<geojson::Feature>> {
    let geometry_col = df.column(COL::GEOMETRY)?;
    let other_cols = df.drop(COL::GEOMETRY)?;
    let mut features = vec![];
    for (idx, geom) in geometry_col.str()?.into_iter().enumerate() {
        if let Some(wkt_str) = geom {
            let geom: Geometry<f64> =
                Geometry::try_from_wkt_str(wkt_str).map_err(|e| anyhow!("Invalid WKT: {e}"))?;
            let mut properties = serde_json::Map::new();
            for col in other_cols.get_columns() {
                let val = any_value_to_json(&col.get(idx)?)?;
                properties.insert(col.name().to_string(), val);
            }
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::from(&geom)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }
    Ok(features)
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// `DataFrame` and save which writes it out
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let mut data: Vec<u8> = vec![];
        self.save(&mut data, df)?;
        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    GeoJSON(GeoJSONFormatter),
    GeoJSONSeq(GeoJSONSeqFormatter),
    Csv(CSVFormatter),
}

/// Format the results as geojson sequence format
/// This is one line per feature serialized as a
/// geojson feature
#[derive(Serialize, Deserialize, Debug)]
pub struct GeoJSONSeqFormatter;

impl OutputGenerator for GeoJSONSeqFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        for feature in features(df)? {
            writeln!(writer, "{feature}")?;
        }
        Ok(())
    }
}

/// Format the results as a CSV file, geometries staying as WKT
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).finish(df)?;
        Ok(())
    }
}

/// Format the results as a geojson feature collection
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GeoJSONFormatter;

impl OutputGenerator for GeoJSONFormatter {
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let feature_collection = geojson::FeatureCollection {
            bbox: None,
            features: features(df)?,
            foreign_members: None,
        };
        Ok(feature_collection.to_string())
    }

    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let result = self.format(df)?;
        writer.write_all(result.as_bytes())?;
        Ok(())
    }
}
