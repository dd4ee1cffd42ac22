use aws_sdk_s3::Client;

/// Build an S3 client from the default AWS credential and region chain.
pub async fn build_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    Client::new(&config)
}
