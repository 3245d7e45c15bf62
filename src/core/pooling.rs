//! Pool lifecycle and allocation rules.
//!
//! Invariant: `0 <= allocated_compliance_units <= total_compliance_units`, and the
//! allocated counter equals the sum of member allocations.

use crate::core::unit_slack;
use crate::domain::model::{
    Pool, PoolAudit, PoolCreateInput, PoolMember, PoolStatus, PoolUpdateInput,
};
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{
    validate_date_order, validate_non_empty_string, validate_non_negative,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn create_pool(id: String, input: &PoolCreateInput, created_at: DateTime<Utc>) -> Result<Pool> {
    validate_date_order("start_date", input.start_date, input.end_date)?;
    validate_non_empty_string("name", &input.name)?;

    Ok(Pool {
        id,
        name: input.name.trim().to_string(),
        description: input.description.as_ref().map(|d| d.trim().to_string()),
        pool_type: input.pool_type,
        status: PoolStatus::Pending,
        start_date: input.start_date,
        end_date: input.end_date,
        total_compliance_units: 0.0,
        allocated_compliance_units: 0.0,
        created_at,
        updated_at: created_at,
    })
}

/// Member share of the pool total, in percent. A zero total is treated as 1.
pub fn contribution(units: f64, total: f64) -> f64 {
    let total = if total == 0.0 { 1.0 } else { total };
    units / total * 100.0
}

pub fn ensure_open(pool: &Pool) -> Result<()> {
    if pool.status == PoolStatus::Closed {
        return Err(LedgerError::validation(
            "pool_status",
            pool.status,
            format!("Pool {} is closed to allocation changes", pool.id),
        ));
    }
    Ok(())
}

/// Rejects `units` that are negative, non-finite, or would push the pool's
/// allocated counter past its total.
pub fn check_allocation(pool: &Pool, units: f64) -> Result<()> {
    validate_non_negative("units", units)?;

    let total = pool.total_compliance_units;
    if pool.allocated_compliance_units + units > total + unit_slack(total) {
        return Err(LedgerError::ConservationViolation {
            pool_id: pool.id.clone(),
            allocated: pool.allocated_compliance_units,
            requested: units,
            total,
        });
    }
    Ok(())
}

pub fn new_member(pool: &Pool, ship_id: &str, units: f64, joined_at: DateTime<Utc>) -> PoolMember {
    PoolMember {
        id: Uuid::new_v4().to_string(),
        pool_id: pool.id.clone(),
        ship_id: ship_id.to_string(),
        allocated_units: units,
        contribution: contribution(units, pool.total_compliance_units),
        joined_at,
    }
}

/// Adds `units` to an existing member, keeping its contribution in step.
pub fn grow_member(pool: &Pool, member: &PoolMember, units: f64) -> PoolMember {
    let allocated_units = member.allocated_units + units;
    PoolMember {
        allocated_units,
        contribution: contribution(allocated_units, pool.total_compliance_units),
        ..member.clone()
    }
}

/// Merges `input` into `pool`. The total may not drop below what is already
/// allocated, and a closed pool stays closed.
pub fn apply_update(pool: &Pool, input: &PoolUpdateInput, now: DateTime<Utc>) -> Result<Pool> {
    let mut updated = pool.clone();

    if let Some(name) = &input.name {
        validate_non_empty_string("name", name)?;
        updated.name = name.trim().to_string();
    }
    if let Some(description) = &input.description {
        let trimmed = description.trim();
        updated.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(pool_type) = input.pool_type {
        updated.pool_type = pool_type;
    }
    if let Some(status) = input.status {
        if pool.status == PoolStatus::Closed && status != PoolStatus::Closed {
            return Err(LedgerError::validation(
                "status",
                status,
                "A closed pool cannot be reopened",
            ));
        }
        updated.status = status;
    }
    if let Some(start) = input.start_date {
        updated.start_date = start;
    }
    if let Some(end) = input.end_date {
        updated.end_date = end;
    }
    validate_date_order("start_date", updated.start_date, updated.end_date)?;

    if let Some(total) = input.total_compliance_units {
        validate_non_negative("total_compliance_units", total)?;
        if pool.allocated_compliance_units > total + unit_slack(total) {
            return Err(LedgerError::ConservationViolation {
                pool_id: pool.id.clone(),
                allocated: pool.allocated_compliance_units,
                requested: 0.0,
                total,
            });
        }
        updated.total_compliance_units = total;
    }

    updated.updated_at = now;
    Ok(updated)
}

/// Recomputes contributions after the pool total changed.
pub fn rescale_members(pool: &Pool, members: &[PoolMember]) -> Vec<PoolMember> {
    members
        .iter()
        .map(|m| PoolMember {
            contribution: contribution(m.allocated_units, pool.total_compliance_units),
            ..m.clone()
        })
        .collect()
}

pub fn total_allocated(members: &[PoolMember]) -> f64 {
    members.iter().map(|m| m.allocated_units).sum()
}

/// Compares the pool counter with the member rows. A mismatch is reported,
/// never corrected.
pub fn reconcile(pool: &Pool, members: &[PoolMember]) -> Result<PoolAudit> {
    let member_sum = total_allocated(members);
    let counter = pool.allocated_compliance_units;

    if (counter - member_sum).abs() > unit_slack(pool.total_compliance_units.max(counter)) {
        return Err(LedgerError::ReconciliationMismatch {
            pool_id: pool.id.clone(),
            counter,
            member_sum,
        });
    }

    Ok(PoolAudit {
        pool_id: pool.id.clone(),
        allocated_compliance_units: counter,
        member_sum,
        member_count: members.len(),
    })
}
