use crate::vision::viridis;

#[test]
fn test_viridis_endpoints() {
    // 起点是深紫色，终点是亮黄色
    let [r0, g0, b0] = viridis(0.);
    assert!(b0 > r0 && g0 < 10);
    let [r1, g1, b1] = viridis(1.);
    assert!(r1 > 240 && g1 > 220 && b1 < 60);
}

#[test]
fn test_viridis_matches_matplotlib_table() {
    assert_eq!(viridis(0.), [0x44, 0x01, 0x54]);
    assert_eq!(viridis(1.), [0xfd, 0xe7, 0x25]);
    // 中点附近是青绿色
    let [r, g, b] = viridis(0.5);
    assert!(r < 50 && g > 130 && b > 130, "{r} {g} {b}");
}

#[test]
fn test_viridis_clamps_out_of_range() {
    assert_eq!(viridis(-3.), viridis(0.));
    assert_eq!(viridis(7.), viridis(1.));
    assert_eq!(viridis(f32::NAN), viridis(0.));
}

#[test]
fn test_viridis_green_is_monotonic() {
    let greens = (0..=10)
        .map(|i| viridis(i as f32 / 10.)[1])
        .collect::<Vec<_>>();
    assert!(greens.windows(2).all(|w| w[0] <= w[1]));
}
