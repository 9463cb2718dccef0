//! Live smoke test against a real gateway deployment. Ignored by default,
//! same as the teacher's own `test_shard_command_ratelimit.rs` against a
//! real Discord token — requires `GATEWAY_URL` and `GATEWAY_TOKEN` to be
//! set.

use serde_json::json;
use std::{
    env,
    error::Error,
    time::{Duration, Instant},
};
use twilight_gateway::{shard::Stage, Config, Intents, Opcode, Shard, ShardId};

fn shard() -> Result<Shard, Box<dyn Error>> {
    let token = env::var("GATEWAY_TOKEN")?;
    let url = env::var("GATEWAY_URL")?;

    let config = Config::new(token, Intents::empty(), url);

    Ok(Shard::new(ShardId::ONE, config)?)
}

#[ignore]
#[tokio::test]
async fn test_shard_command_ratelimit() -> Result<(), Box<dyn Error>> {
    let mut shard = shard()?;

    loop {
        shard.next_event().await?;

        if shard.stage() == Stage::Connected {
            break;
        }
    }

    let payload = json!(null);

    let started_at = Instant::now();
    shard.send(Opcode::Heartbeat, &payload).await?;
    assert!(started_at.elapsed() < Duration::from_millis(500));

    Ok(())
}
