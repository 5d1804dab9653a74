use super::*;
use crate::media::graph::{Filter, FilterChain, Pad};

#[test]
fn inputs_carry_their_loop_flags_in_order() {
    let cmd = FfmpegCommand::new("mux", "/out/final.mp4")
        .stream_loop(Path::new("/in/music.mp3"))
        .input(Path::new("/in/video.mp4"))
        .looped_image(Path::new("/in/wm.png"))
        .map("1:v")
        .map("0:a");
    assert_eq!(
        cmd.to_arg_strings(),
        vec![
            "-stream_loop",
            "-1",
            "-i",
            "/in/music.mp3",
            "-i",
            "/in/video.mp4",
            "-loop",
            "1",
            "-i",
            "/in/wm.png",
            "-map",
            "1:v",
            "-map",
            "0:a",
            "/out/final.mp4",
        ]
    );
}

#[test]
fn profile_flags_match_delivery_format() {
    let p = EncodeProfile::default();
    let cmd = FfmpegCommand::new("x", "o.mp4")
        .input(Path::new("i.mp4"))
        .encode_video(&p)
        .encode_audio(&p)
        .rate(p.fps)
        .faststart();
    assert_eq!(cmd.arg_value("-c:v").as_deref(), Some("libx264"));
    assert_eq!(cmd.arg_value("-crf").as_deref(), Some("18"));
    assert_eq!(cmd.arg_value("-preset").as_deref(), Some("veryfast"));
    assert_eq!(cmd.arg_value("-pix_fmt").as_deref(), Some("yuv420p"));
    assert_eq!(cmd.arg_value("-ar").as_deref(), Some("44100"));
    assert_eq!(cmd.arg_value("-r").as_deref(), Some("24"));
    assert_eq!(cmd.arg_value("-movflags").as_deref(), Some("+faststart"));
}

#[test]
fn concat_list_and_filter_graph_are_emitted() {
    let graph = FilterGraph::new().with(
        FilterChain::new([Pad::video(0)])
            .then(Filter::new("null"))
            .to([Pad::new("v")]),
    );
    let cmd = FfmpegCommand::new("concat", "o.mp4")
        .concat_list(Path::new("list.txt"))
        .filter_graph(graph)
        .copy_streams();
    let args = cmd.to_arg_strings();
    assert_eq!(&args[..6], ["-f", "concat", "-safe", "0", "-i", "list.txt"]);
    assert_eq!(cmd.arg_value("-filter_complex").as_deref(), Some("[0:v]null[v]"));
    assert_eq!(cmd.arg_value("-c").as_deref(), Some("copy"));
    cmd.validate().unwrap();
}

#[test]
fn command_without_inputs_is_invalid() {
    assert!(FfmpegCommand::new("x", "o.mp4").validate().is_err());
}

#[test]
fn duration_uses_compact_numbers() {
    let cmd = FfmpegCommand::new("title", "t.mp4")
        .looped_image(Path::new("t.png"))
        .duration(2.0);
    assert_eq!(cmd.arg_value("-t").as_deref(), Some("2"));
    assert!(cmd.to_string().starts_with("ffmpeg -loop 1 -i t.png"));
}
