use rts_intersection::{LightConfig, Phase, TrafficLight};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};

fn spawn_waiter(light: &Arc<TrafficLight>, broadcast: bool) -> JoinHandle<()> {
    let light = Arc::clone(light);
    tokio::spawn(async move {
        if broadcast {
            light.wait_until_green().await.unwrap();
        } else {
            light.wait_for_green().await;
        }
    })
}

fn finished(waiters: &[JoinHandle<()>]) -> usize {
    waiters.iter().filter(|w| w.is_finished()).count()
}

#[tokio::test(start_paused = true)]
async fn one_green_releases_one_channel_waiter() {
    let light = Arc::new(TrafficLight::new("north", LightConfig::fixed(1000)));
    light.start().unwrap();
    let waiters = vec![spawn_waiter(&light, false), spawn_waiter(&light, false)];

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(light.phase(), Phase::Green);
    assert_eq!(finished(&waiters), 1);

    // the red at 2000 ms is not enough
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(light.phase(), Phase::Red);
    assert_eq!(finished(&waiters), 1);

    // the green at 3000 ms releases the other one
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(finished(&waiters), 2);
    assert_eq!(light.pending_updates(), 0);
}

#[tokio::test(start_paused = true)]
async fn one_green_releases_every_broadcast_waiter() {
    let light = Arc::new(TrafficLight::new("south", LightConfig::fixed(1000)));
    light.start().unwrap();
    let waiters: Vec<_> = (0..5).map(|_| spawn_waiter(&light, true)).collect();

    sleep(Duration::from_millis(999)).await;
    assert_eq!(finished(&waiters), 0);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(finished(&waiters), 5);
}

#[tokio::test(start_paused = true)]
async fn channel_wait_ignores_greens_from_before_the_call() {
    let light = TrafficLight::new("east", LightConfig::fixed(1000));
    light.start().unwrap();

    // green at 1000 ms, red at 2000 ms, green at 3000 ms, red at 4000 ms
    sleep(Duration::from_millis(4500)).await;
    assert_eq!(light.phase(), Phase::Red);
    assert_eq!(light.pending_updates(), 0);

    let began = Instant::now();
    light.wait_for_green().await;
    assert_eq!(began.elapsed(), Duration::from_millis(500));
    assert_eq!(light.phase(), Phase::Green);
}

#[tokio::test(start_paused = true)]
async fn toggles_do_not_pile_up_without_channel_waiters() {
    let light = Arc::new(TrafficLight::new("north-east", LightConfig::fixed(1000)));
    light.start().unwrap();

    for _ in 0..50 {
        light.wait_until_green().await.unwrap();
    }
    sleep(Duration::from_millis(500)).await;
    assert_eq!(light.pending_updates(), 0);

    // a channel waiter registered mid-run only sees what comes next
    let waiter = spawn_waiter(&light, false);
    sleep(Duration::from_millis(1000)).await;
    assert!(!waiter.is_finished());
    assert_eq!(light.phase(), Phase::Red);
    sleep(Duration::from_millis(1000)).await;
    assert!(waiter.is_finished());
    assert_eq!(light.pending_updates(), 0);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_strict_alternation() {
    let light = TrafficLight::new("west", LightConfig::fixed(250));
    let mut phases = light.subscribe();
    light.start().unwrap();

    let mut seen = Vec::new();
    for _ in 0..6 {
        phases.changed().await.unwrap();
        seen.push(*phases.borrow_and_update());
    }
    assert_eq!(
        seen,
        vec![
            Phase::Green,
            Phase::Red,
            Phase::Green,
            Phase::Red,
            Phase::Green,
            Phase::Red
        ]
    );

    light.stop().await;
    assert!(!light.is_running());
}
