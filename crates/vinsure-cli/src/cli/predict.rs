use super::project::Project;
use anyhow::Result;
use clap::Args;
use vinsure::services::{PredictionService, VehicleData};

#[derive(Args)]
pub struct PredictArgs {
    /// 1 for male, 0 for female
    #[arg(long)]
    gender: u8,

    #[arg(long)]
    age: i64,

    #[arg(long)]
    driving_license: u8,

    #[arg(long)]
    region_code: f64,

    #[arg(long)]
    previously_insured: u8,

    #[arg(long)]
    annual_premium: f64,

    #[arg(long)]
    policy_sales_channel: f64,

    /// Days associated with the company
    #[arg(long)]
    vintage: i64,

    /// Vehicle is less than a year old
    #[arg(long, default_value = "0")]
    vehicle_age_lt_1_year: u8,

    /// Vehicle is more than two years old
    #[arg(long, default_value = "0")]
    vehicle_age_gt_2_years: u8,

    #[arg(long)]
    vehicle_damage_yes: u8,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl PredictArgs {
    fn vehicle_data(&self) -> VehicleData {
        VehicleData {
            gender: self.gender,
            age: self.age,
            driving_license: self.driving_license,
            region_code: self.region_code,
            previously_insured: self.previously_insured,
            annual_premium: self.annual_premium,
            policy_sales_channel: self.policy_sales_channel,
            vintage: self.vintage,
            vehicle_age_lt_1_year: self.vehicle_age_lt_1_year,
            vehicle_age_gt_2_years: self.vehicle_age_gt_2_years,
            vehicle_damage_yes: self.vehicle_damage_yes,
        }
    }
}

pub async fn execute(args: PredictArgs) -> Result<()> {
    let project = Project::load()?;
    let service = PredictionService::new(project.session(), project.model_file());

    let prediction = service.predict(&args.vehicle_data()).await?;

    if args.json {
        let output = serde_json::json!({
            "prediction": prediction.value,
            "label": prediction.label(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", prediction.label());
    }

    Ok(())
}
