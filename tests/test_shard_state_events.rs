//! Live smoke test against a real gateway deployment. Ignored by default,
//! same as the teacher's own `test_shard_state_events.rs` against a real
//! Discord token — requires `GATEWAY_URL` and `GATEWAY_TOKEN` to be set.

use std::{env, error::Error};
use twilight_gateway::{shard::Stage, Config, Intents, Shard, ShardId};

fn shard() -> Result<Shard, Box<dyn Error>> {
    let token = env::var("GATEWAY_TOKEN")?;
    let url = env::var("GATEWAY_URL")?;

    let config = Config::new(token, Intents::empty(), url);

    Ok(Shard::new(ShardId::ONE, config)?)
}

#[ignore]
#[tokio::test]
async fn test_shard_reaches_connected_stage() -> Result<(), Box<dyn Error>> {
    let mut shard = shard()?;

    loop {
        shard.next_event().await?;

        if shard.stage() == Stage::Connected {
            break;
        }
    }

    Ok(())
}
