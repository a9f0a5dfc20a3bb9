//! Quill onboarding HTTP service entry point.
use onboarding::app::run_with_shutdown;
use onboarding::config::OnboardingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OnboardingConfig::from_env_or_yaml().expect("onboarding config");
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
