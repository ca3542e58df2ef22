//! Aggregation of point loss records into zone-level statistics.
//!
//! Each loss record names the zone it falls in through a zone-id attribute.
//! For every zone the number of records is written to a `count` column and,
//! per loss attribute, the sum and average of the record values to `sum_*`
//! and `avg_*` columns. Zones that received no records can optionally be
//! removed afterwards.

use crate::compute::naming;
use crate::config::EngineConfig;
use crate::store::FeatureId;
use crate::table::{Cell, EditSession, FeatureTable, TableError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("No loss attribute was selected")]
    NoLossFields,
    #[error("Zone id '{value}' of feature {feature} is not a valid identifier")]
    InvalidZoneId { feature: FeatureId, value: f64 },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Which attributes link the loss records to the zones.
#[derive(Debug, Clone, PartialEq)]
pub struct LossAggregation {
    /// Numeric loss attributes of the loss table to aggregate.
    pub loss_fields: Vec<String>,
    /// Attribute of the loss table naming the zone a record belongs to.
    pub loss_zone_field: String,
    /// Attribute of the zonal table identifying each zone.
    pub zone_id_field: String,
    /// Delete zones that received no loss record.
    pub purge_empty_zones: bool,
}

/// Result columns written for one loss attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct LossColumns {
    pub loss_field: String,
    pub sum_field: String,
    pub avg_field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZonalStats {
    pub count_field: String,
    pub loss_columns: Vec<LossColumns>,
    /// Loss records without a zone id, or whose zone is not in the zonal table.
    pub unmatched_records: usize,
    pub purged_zones: Vec<FeatureId>,
}

/// Zone ids compare by their text form, so a numeric `12` in one table
/// matches a text `"12"` in the other.
fn zone_key(cell: Cell, feature: FeatureId) -> Result<Option<String>, AggregationError> {
    match cell {
        Cell::Missing => Ok(None),
        Cell::Text(t) => {
            let t = t.trim();
            Ok((!t.is_empty()).then(|| t.to_string()))
        }
        Cell::Number(v) if !v.is_finite() => Err(AggregationError::InvalidZoneId { feature, value: v }),
        Cell::Number(v) if v.fract() == 0.0 => Ok(Some(format!("{}", v as i64))),
        Cell::Number(v) => Ok(Some(v.to_string())),
    }
}

/// Running totals of one zone.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: usize,
    // Per loss attribute: (sum, number of values summed).
    totals: Vec<(f64, usize)>,
}

impl Accumulator {
    fn new(attributes: usize) -> Self {
        Self { count: 0, totals: vec![(0.0, 0); attributes] }
    }
}

/// Aggregates the records of `losses` into new columns of `zones`.
///
/// Missing or non-finite loss values are left out of that attribute's sum
/// and average but the record still counts. A zone with no value for an
/// attribute gets missing `sum_*` and `avg_*` cells.
///
/// Nothing is written until every record has been read; if writing fails,
/// the columns created by this call are removed again.
pub fn aggregate_losses<L, Z>(
    losses: &L,
    zones: &mut Z,
    request: &LossAggregation,
    config: &EngineConfig,
) -> Result<ZonalStats, AggregationError>
where
    L: FeatureTable + ?Sized,
    Z: FeatureTable + ?Sized,
{
    if request.loss_fields.is_empty() {
        return Err(AggregationError::NoLossFields);
    }
    for field in request.loss_fields.iter().chain([&request.loss_zone_field]) {
        if !losses.has_field(field) {
            return Err(TableError::UnknownField(field.clone()).into());
        }
    }

    // 1. Index the zones by id.
    let zone_rows = zones.row_ids();
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();
    let mut zone_keys = Vec::with_capacity(zone_rows.len());
    for &zone in &zone_rows {
        let key = zone_key(zones.get_cell(zone, &request.zone_id_field)?, zone)?;
        if let Some(k) = &key {
            accumulators.entry(k.clone()).or_insert_with(|| Accumulator::new(request.loss_fields.len()));
        }
        zone_keys.push(key);
    }

    // 2. Fold every loss record into its zone.
    let mut unmatched_records = 0;
    for record in losses.row_ids() {
        let key = zone_key(losses.get_cell(record, &request.loss_zone_field)?, record)?;
        let Some(acc) = key.and_then(|k| accumulators.get_mut(&k)) else {
            unmatched_records += 1;
            continue;
        };
        acc.count += 1;
        for (i, field) in request.loss_fields.iter().enumerate() {
            match losses.get_cell(record, field)? {
                Cell::Number(v) if v.is_finite() => {
                    acc.totals[i].0 += v;
                    acc.totals[i].1 += 1;
                }
                Cell::Number(_) | Cell::Missing => {}
                Cell::Text(_) => return Err(TableError::NonNumeric { field: field.clone(), feature: record }.into()),
            }
        }
    }

    // 3. Allocate the result columns.
    let max_len = config.max_field_name_len;
    let mut created = Vec::new();
    let columns = allocate_result_columns(zones, &request.loss_fields, max_len, &mut created);
    let (count_field, loss_columns) = match columns {
        Ok(columns) => columns,
        Err(e) => {
            remove_columns(zones, &created);
            return Err(e.into());
        }
    };

    // 4. Write every zone in one session.
    let written = write_stats(zones, &zone_rows, &zone_keys, &accumulators, &count_field, &loss_columns);
    if let Err(e) = written {
        remove_columns(zones, &created);
        return Err(e.into());
    }

    // 5. Optionally drop zones nobody reported losses for.
    let mut purged_zones = Vec::new();
    if request.purge_empty_zones {
        purged_zones = zone_rows
            .iter()
            .zip(&zone_keys)
            .filter(|&(_, key)| key.as_ref().and_then(|k| accumulators.get(k)).map_or(true, |acc| acc.count == 0))
            .map(|(&zone, _)| zone)
            .collect();
        let mut session = EditSession::begin(zones, "Purge zones without loss points")?;
        for &zone in &purged_zones {
            session.delete_row(zone)?;
        }
        session.commit()?;
    }

    if unmatched_records > 0 {
        warn!(unmatched = unmatched_records, "loss records outside every zone");
    }
    info!(
        zones = zone_rows.len() - purged_zones.len(),
        attributes = loss_columns.len(),
        purged = purged_zones.len(),
        "losses aggregated"
    );
    Ok(ZonalStats { count_field, loss_columns, unmatched_records, purged_zones })
}

fn allocate_result_columns<Z: FeatureTable + ?Sized>(
    zones: &mut Z,
    loss_fields: &[String],
    max_len: Option<usize>,
    created: &mut Vec<String>,
) -> Result<(String, Vec<LossColumns>), TableError> {
    let mut allocate = |zones: &mut Z, base: String| -> Result<String, TableError> {
        let field = naming::allocate_column(zones, &base, max_len)?;
        created.push(field.clone());
        Ok(field)
    };
    let count_field = allocate(&mut *zones, "count".to_string())?;
    let mut loss_columns = Vec::with_capacity(loss_fields.len());
    for loss_field in loss_fields {
        loss_columns.push(LossColumns {
            loss_field: loss_field.clone(),
            sum_field: allocate(&mut *zones, format!("sum_{}", loss_field))?,
            avg_field: allocate(&mut *zones, format!("avg_{}", loss_field))?,
        });
    }
    Ok((count_field, loss_columns))
}

fn write_stats<Z: FeatureTable + ?Sized>(
    zones: &mut Z,
    zone_rows: &[FeatureId],
    zone_keys: &[Option<String>],
    accumulators: &HashMap<String, Accumulator>,
    count_field: &str,
    loss_columns: &[LossColumns],
) -> Result<(), TableError> {
    let mut session = EditSession::begin(zones, "Aggregate losses")?;
    for (&zone, key) in zone_rows.iter().zip(zone_keys) {
        let acc = key.as_ref().and_then(|k| accumulators.get(k));
        let count = acc.map_or(0, |a| a.count);
        session.set_cell(zone, count_field, Cell::Number(count as f64))?;
        for (i, columns) in loss_columns.iter().enumerate() {
            let (sum, summed) = acc.map_or((0.0, 0), |a| a.totals[i]);
            let (sum, avg) = if summed == 0 {
                (Cell::Missing, Cell::Missing)
            } else {
                (Cell::Number(sum), Cell::Number(sum / summed as f64))
            };
            session.set_cell(zone, &columns.sum_field, sum)?;
            session.set_cell(zone, &columns.avg_field, avg)?;
        }
    }
    session.commit()
}

fn remove_columns<Z: FeatureTable + ?Sized>(zones: &mut Z, created: &[String]) {
    for field in created {
        if let Err(e) = zones.delete_column(field) {
            warn!(field = %field, error = %e, "could not remove column");
        }
    }
}
