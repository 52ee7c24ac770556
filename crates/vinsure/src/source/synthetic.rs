use super::record::{Gender, InsuranceRecord, VehicleAge, VehicleDamage};
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Rows in the constant fallback dataset
pub const CONSTANT_ROWS: usize = 10;

/// Generate `rows` schema-valid records from a seeded generator.
///
/// About 30% of rows respond. Interest is concentrated on damaged, uninsured
/// vehicles so a fitted model has signal to find.
pub fn generate(rows: usize, seed: u64) -> Result<Vec<InsuranceRecord>> {
    if rows == 0 {
        bail!("synthetic dataset needs at least one row");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let records = (1..=rows)
        .map(|id| {
            let previously_insured = u8::from(rng.gen_bool(0.5));
            let damaged = rng.gen_bool(0.5);
            let interest = if damaged && previously_insured == 0 {
                0.75
            } else {
                0.15
            };

            InsuranceRecord {
                id: Some(id as i64),
                gender: Some(if rng.gen_bool(0.5) {
                    Gender::Male
                } else {
                    Gender::Female
                }),
                age: Some(rng.gen_range(18..70)),
                driving_license: Some(u8::from(rng.gen_bool(0.95))),
                region_code: Some(rng.gen_range(1.0..50.0)),
                previously_insured: Some(previously_insured),
                vehicle_age: Some(match rng.gen_range(0..3) {
                    0 => VehicleAge::BelowOneYear,
                    1 => VehicleAge::OneToTwoYears,
                    _ => VehicleAge::AboveTwoYears,
                }),
                vehicle_damage: Some(if damaged {
                    VehicleDamage::Yes
                } else {
                    VehicleDamage::No
                }),
                annual_premium: Some(rng.gen_range(20_000.0..60_000.0)),
                policy_sales_channel: Some(rng.gen_range(100.0..200.0)),
                vintage: Some(rng.gen_range(1..100)),
                response: Some(u8::from(rng.gen_bool(interest))),
            }
        })
        .collect();

    Ok(records)
}

/// Fixed dataset used when generation fails; alternates the response
pub fn constant() -> Vec<InsuranceRecord> {
    (1..=CONSTANT_ROWS)
        .map(|id| {
            let interested = id % 2 == 0;
            InsuranceRecord {
                id: Some(id as i64),
                gender: Some(if interested {
                    Gender::Male
                } else {
                    Gender::Female
                }),
                age: Some(25 + id as i64),
                driving_license: Some(1),
                region_code: Some(28.0),
                previously_insured: Some(u8::from(!interested)),
                vehicle_age: Some(if interested {
                    VehicleAge::OneToTwoYears
                } else {
                    VehicleAge::BelowOneYear
                }),
                vehicle_damage: Some(if interested {
                    VehicleDamage::Yes
                } else {
                    VehicleDamage::No
                }),
                annual_premium: Some(30_000.0),
                policy_sales_channel: Some(152.0),
                vintage: Some(50),
                response: Some(u8::from(interested)),
            }
        })
        .collect()
}
