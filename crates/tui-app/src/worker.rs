//! 生成线程
//!
//! 每次发送消息启动一个生成线程：套用聊天模板、调用流式生成，
//! 把每个片段按顺序发回 UI 线程，最后恰好发送一次结束通知。

use crate::event::{Event, GenerationEvent};
use inference::{ConversationTurn, InferenceError, ModelHandle};
use std::fmt;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

/// 生成任务编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(pub u64);

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 生成线程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Completed,
}

/// 生成出错时显示在聊天记录中的片段
pub fn error_fragment(err: &InferenceError) -> String {
    format!("\n[生成出错: {}]", err)
}

/// 生成线程
pub struct GenerationWorker {
    id: GenerationId,
    handle: ModelHandle,
    user_text: String,
    max_tokens: usize,
    state: WorkerState,
}

impl GenerationWorker {
    /// 创建生成任务
    pub fn new(id: GenerationId, handle: ModelHandle, user_text: String, max_tokens: usize) -> Self {
        Self {
            id,
            handle,
            user_text,
            max_tokens,
            state: WorkerState::Created,
        }
    }

    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// 在新线程中运行
    pub fn spawn(mut self, events: mpsc::Sender<Event>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("generation-{}", self.id))
            .spawn(move || self.run(&events))
    }

    /// 运行生成流程（阻塞当前线程）
    ///
    /// 不能在异步运行时的线程中调用：片段通过 `blocking_send` 发送。
    pub fn run(&mut self, events: &mpsc::Sender<Event>) {
        if self.state != WorkerState::Created {
            tracing::warn!("生成任务 {} 已运行过，忽略", self.id);
            return;
        }
        self.state = WorkerState::Running;
        tracing::info!(
            "生成任务 {} 开始 (模型: {})",
            self.id,
            self.handle.identifier()
        );

        let sink = FragmentSink {
            id: self.id,
            events,
        };

        match self.stream(&sink) {
            Ok(count) => tracing::info!("生成任务 {} 完成，共 {} 个片段", self.id, count),
            Err(err) => {
                tracing::error!("生成任务 {} 出错: {}", self.id, err);
                sink.fragment(error_fragment(&err));
            }
        }

        self.state = WorkerState::Completed;
        sink.finished();
    }

    /// 逐片段转发，返回转发的片段数
    fn stream(&self, sink: &FragmentSink<'_>) -> Result<usize, InferenceError> {
        let turns = [ConversationTurn::user(self.user_text.as_str())];
        let prompt = self.handle.apply_chat_template(&turns, true)?;

        let mut count = 0;
        for fragment in self.handle.stream_generate(&prompt, self.max_tokens)? {
            let fragment = fragment?;
            if fragment.is_empty() {
                continue;
            }
            if !sink.fragment(fragment) {
                tracing::debug!("UI 已关闭，停止生成任务 {}", self.id);
                break;
            }
            count += 1;
        }

        Ok(count)
    }
}

/// 把片段发回 UI 线程
struct FragmentSink<'a> {
    id: GenerationId,
    events: &'a mpsc::Sender<Event>,
}

impl FragmentSink<'_> {
    /// 发送片段；接收端已关闭时返回 false
    fn fragment(&self, text: String) -> bool {
        let event = GenerationEvent::Fragment { id: self.id, text };
        self.events.blocking_send(Event::Generation(event)).is_ok()
    }

    fn finished(&self) {
        let event = GenerationEvent::Finished { id: self.id };
        if self.events.blocking_send(Event::Generation(event)).is_err() {
            tracing::debug!("UI 已关闭，生成任务 {} 的结束通知未送达", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scripted_handle, Script};

    fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::Generation(event) => events.push(event),
                other => panic!("意外的事件: {:?}", other),
            }
        }
        events
    }

    fn fragment(id: u64, text: &str) -> GenerationEvent {
        GenerationEvent::Fragment {
            id: GenerationId(id),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_fragments_forwarded_in_order_then_finished() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = scripted_handle(Script::fragments(&["f1", "f2", "f3"]));
        let mut worker = GenerationWorker::new(GenerationId(1), handle, "hi".to_string(), 512);
        assert_eq!(worker.state(), WorkerState::Created);

        worker.run(&tx);

        assert_eq!(worker.state(), WorkerState::Completed);
        assert_eq!(
            drain(&mut rx),
            vec![
                fragment(1, "f1"),
                fragment(1, "f2"),
                fragment(1, "f3"),
                GenerationEvent::Finished { id: GenerationId(1) },
            ]
        );
    }

    #[test]
    fn test_prompt_uses_generation_prompt_and_token_cap() {
        let (tx, mut rx) = mpsc::channel(64);
        let script = Script::fragments(&["ok"]);
        let calls = script.calls();
        let handle = scripted_handle(script);

        GenerationWorker::new(GenerationId(2), handle, "你好".to_string(), 512).run(&tx);
        drain(&mut rx);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "<user>你好</user><assistant>");
        assert_eq!(calls[0].max_tokens, 512);
    }

    #[test]
    fn test_mid_stream_failure_emits_error_then_single_finish() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = scripted_handle(Script::fragments(&["a", "b", "c"]).fail_at(1));

        GenerationWorker::new(GenerationId(3), handle, "x".to_string(), 512).run(&tx);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], fragment(3, "a"));
        match &events[1] {
            GenerationEvent::Fragment { text, .. } => {
                assert!(text.starts_with("\n[生成出错: "));
                assert!(text.ends_with(']'));
            }
            other => panic!("应为错误片段: {:?}", other),
        }
        assert_eq!(events[2], GenerationEvent::Finished { id: GenerationId(3) });
    }

    #[test]
    fn test_start_failure_still_finishes_once() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = scripted_handle(Script::fragments(&[]).fail_on_start());

        GenerationWorker::new(GenerationId(4), handle, "x".to_string(), 512).run(&tx);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GenerationEvent::Fragment { .. }));
        assert_eq!(events[1], GenerationEvent::Finished { id: GenerationId(4) });
    }

    #[test]
    fn test_empty_fragments_are_skipped() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = scripted_handle(Script::fragments(&["", "x", ""]));

        GenerationWorker::new(GenerationId(5), handle, "x".to_string(), 512).run(&tx);

        assert_eq!(
            drain(&mut rx),
            vec![fragment(5, "x"), GenerationEvent::Finished { id: GenerationId(5) }]
        );
    }

    #[test]
    fn test_run_twice_emits_nothing_more() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = scripted_handle(Script::fragments(&["x"]));
        let mut worker = GenerationWorker::new(GenerationId(6), handle, "x".to_string(), 512);

        worker.run(&tx);
        drain(&mut rx);
        worker.run(&tx);

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_closed_ui_stops_worker() {
        let (tx, rx) = mpsc::channel(64);
        drop(rx);
        let handle = scripted_handle(Script::fragments(&["a", "b"]));
        let mut worker = GenerationWorker::new(GenerationId(7), handle, "x".to_string(), 512);

        worker.run(&tx);
        assert_eq!(worker.state(), WorkerState::Completed);
    }

    #[test]
    fn test_spawned_worker_delivers_on_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = scripted_handle(Script::fragments(&["one", "two"]));
        let worker = GenerationWorker::new(GenerationId(8), handle, "x".to_string(), 512);

        let join = worker.spawn(tx).unwrap();
        let mut received = Vec::new();
        while let Some(Event::Generation(event)) = rx.blocking_recv() {
            let done = matches!(event, GenerationEvent::Finished { .. });
            received.push(event);
            if done {
                break;
            }
        }
        join.join().unwrap();

        assert_eq!(
            received,
            vec![
                fragment(8, "one"),
                fragment(8, "two"),
                GenerationEvent::Finished { id: GenerationId(8) },
            ]
        );
    }
}
