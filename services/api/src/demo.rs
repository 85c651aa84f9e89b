use crate::infra::{
    sample_annual_exam, sample_class_10a, sample_class_10b, sample_school, sample_student_asha,
    seeded_directory, seeded_ledger, InMemoryAdmitCardStore, InMemorySettingsStore,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use vidya::config::WorkflowConfig;
use vidya::error::AppError;
use vidya::workflows::admit_card::{
    AdmitCardService, AdmitCardStore, BulkReport, PaymentMethod, PaymentRequest, PostPaymentState,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date for exam status and eligibility (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let policies = Arc::new(InMemorySettingsStore::default());
    let directory = Arc::new(seeded_directory());
    let ledger = Arc::new(seeded_ledger());
    let cards = Arc::new(InMemoryAdmitCardStore::default());
    let service = AdmitCardService::new(
        policies,
        directory,
        ledger,
        cards.clone(),
        WorkflowConfig::default().bulk_workers,
    );

    let school = sample_school();
    let annual = sample_annual_exam();
    let asha = sample_student_asha();

    println!("Admit card workflow demo");
    let settings = service.settings(&school);
    println!(
        "School '{}' policy: {}% fee threshold | clearance {} | signed by {}",
        school,
        settings.min_fee_percentage,
        if settings.require_fee_clearance {
            "required"
        } else {
            "waived"
        },
        settings.signature_authority.label()
    );

    println!("\nExam slate (as of {})", today);
    let exams = match service.exams(&school, today) {
        Ok(exams) => exams,
        Err(err) => {
            println!("  Exam listing unavailable: {}", err);
            return Ok(());
        }
    };
    for exam in &exams {
        println!(
            "- {} [{}] {} -> {} ({})",
            exam.name,
            exam.kind.label(),
            exam.starts_on,
            exam.ends_on,
            exam.status
        );
    }

    println!("\nStudent overview");
    let overview = match service.student_overview(&school, &asha, today) {
        Ok(overview) => overview,
        Err(err) => {
            println!("  Overview unavailable: {}", err);
            return Ok(());
        }
    };
    println!(
        "- {} ({}, class {})",
        overview.student_name, overview.student_id, overview.class_id
    );
    for entry in &overview.exams {
        let card = entry
            .admit_card
            .as_ref()
            .map(|card| card.admit_card_no.to_string());
        println!(
            "  - {}: paid ₹{} of ₹{} | eligible {} | short ₹{} | card {}",
            entry.exam.name,
            entry.fee.paid_fee,
            entry.fee.total_fee,
            entry.is_eligible,
            entry.min_amount_required,
            card.as_deref().unwrap_or("none")
        );
    }

    println!("\nDownload attempt before payment");
    match service.generate(&school, &annual, &asha) {
        Ok(record) => println!("- Issued {}", record.admit_card_no),
        Err(err) => println!("- Blocked: {}", err),
    }

    println!("\nPay and download (₹1200 over UPI)");
    let request = PaymentRequest {
        school_id: school.clone(),
        student_id: asha.clone(),
        exam_id: annual.clone(),
        amount: 1_200,
        payment_method: PaymentMethod::Upi,
    };
    let outcome = match service.pay_and_generate(request) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Payment failed: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Receipt {} for ₹{} ({})",
        outcome.receipt.payment_id,
        outcome.receipt.amount,
        outcome.receipt.method.label()
    );
    match &outcome.state {
        PostPaymentState::Issued(record) => {
            println!(
                "- Admit card {} for {}",
                record.admit_card_no, record.document.student.name
            );
            match serde_json::to_string_pretty(&record.view()) {
                Ok(json) => println!("  Card payload:\n{}", json),
                Err(err) => println!("  Card payload unavailable: {}", err),
            }
        }
        state => println!("- {}", state.summary()),
    }

    println!("\nRepeat download");
    match service.generate(&school, &annual, &asha) {
        Ok(record) => println!(
            "- Same card {} returned, generated at {}",
            record.admit_card_no, record.generated_at
        ),
        Err(err) => println!("- Download failed: {}", err),
    }

    println!("\nBulk generation for Class 10-A");
    match service
        .bulk_generate(&school, &annual, &sample_class_10a(), false)
        .await
    {
        Ok(report) => render_bulk_report(&report),
        Err(err) => println!("  Bulk run failed: {}", err),
    }

    println!("\nForced bulk generation for Class 10-B");
    match service
        .bulk_generate(&school, &annual, &sample_class_10b(), true)
        .await
    {
        Ok(report) => render_bulk_report(&report),
        Err(err) => println!("  Bulk run failed: {}", err),
    }

    match cards.issued_for_exam(&school, &annual) {
        Ok(records) => {
            let flagged: Vec<_> = records
                .iter()
                .filter(|record| record.fee_pending_at_issue)
                .collect();
            if flagged.is_empty() {
                println!("\nFee follow-up list: empty");
            } else {
                println!("\nFee follow-up list (issued with fees pending)");
                for record in flagged {
                    println!(
                        "- {} ({})",
                        record.document.student.name, record.admit_card_no
                    );
                }
            }
        }
        Err(err) => println!("\nFee follow-up list unavailable: {}", err),
    }

    Ok(())
}

fn render_bulk_report(report: &BulkReport) {
    println!(
        "- {} students: {} generated, {} pending fees, {} failed",
        report.total_students,
        report.generated_count,
        report.pending_fee_count,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  - {}: {}", failure.student_id, failure.reason);
    }
}
