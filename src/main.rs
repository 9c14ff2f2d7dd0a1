#[tokio::main]
async fn main() {
  if let Err(e) = routine_log_lib::run().await {
    eprintln!("routine-log: {}", e);
    std::process::exit(1);
  }
}
