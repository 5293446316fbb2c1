#[tokio::main]
async fn main() -> anyhow::Result<()> {
    course_api::start_server().await
}
