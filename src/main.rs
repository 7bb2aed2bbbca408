#[tokio::main]
async fn main() {
    pension_server::start_server().await;
}
