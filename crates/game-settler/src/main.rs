#[tokio::main]
async fn main() {
    game_settler::start(std::env::args()).await;
}
