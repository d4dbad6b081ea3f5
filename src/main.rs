#[tokio::main]
async fn main() {
    if let Err(e) = clinic_emr_lib::run().await {
        eprintln!("clinic-emr: {e}");
        std::process::exit(1);
    }
}
