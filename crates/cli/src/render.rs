use std::fmt::Write as _;
use std::io::Write;

use counsel_client::{Presenter, StoreView};
use counsel_core::{
    ChatState, ChecklistItem, ChecklistStatus, Message, MessageKind, Role, SessionId,
    SessionSummary,
};
use counsel_runtime_config::NoticeSettings;
use tracing::debug;

const BAR_WIDTH: usize = 20;

pub fn status_icon(status: ChecklistStatus) -> char {
    match status {
        ChecklistStatus::Yes => '✓',
        ChecklistStatus::No => '✕',
        ChecklistStatus::Pending => '○',
    }
}

pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn format_message(message: &Message) -> String {
    let prefix = match (message.kind, message.role) {
        (MessageKind::Pending, _) => "  … ",
        (MessageKind::Notice, _) => "  ! ",
        (MessageKind::Reply, Role::User) => "나 › ",
        (MessageKind::Reply, Role::Ai) if message.is_terminal_conclusion => "상담 ★ ",
        (MessageKind::Reply, Role::Ai) => "상담 › ",
    };
    let indent = " ".repeat(prefix.chars().count());
    let mut out = String::new();
    for (i, line) in message.text.lines().enumerate() {
        if i == 0 {
            out.push_str(prefix);
        } else {
            out.push('\n');
            out.push_str(&indent);
        }
        out.push_str(line);
    }
    if out.is_empty() {
        out.push_str(prefix.trim_end());
    }
    out
}

fn format_item(item: &ChecklistItem) -> String {
    let mut line = format!("    {} {}", status_icon(item.status), item.requirement_text);
    if let Some(reason) = item.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        let _ = write!(line, " ({reason})");
    }
    line
}

/// Issue badges with progress bars and checklists.
pub fn format_issues(state: &ChatState, notices: &NoticeSettings) -> String {
    if state.issues().is_empty() {
        return format!("  [{}]\n", notices.no_issues);
    }
    let mut out = String::new();
    for issue in state.issues() {
        let key = issue.key();
        let percent = state.effective_percent(key);
        let _ = writeln!(
            out,
            "  [{}] {} {percent:>3}%",
            state.display_label(key),
            progress_bar(percent)
        );
        for item in state.checklist_for(key) {
            let _ = writeln!(out, "{}", format_item(item));
        }
    }
    if let Some(step) = state.current_step() {
        let _ = writeln!(out, "  → {step}");
    }
    out
}

pub fn format_state(state: &ChatState, notices: &NoticeSettings) -> String {
    let mut out = String::new();
    for message in state.messages() {
        let _ = writeln!(out, "{}", format_message(message));
    }
    out.push('\n');
    out.push_str(&format_issues(state, notices));
    out
}

/// Numbered roster; the numbers are what `/switch` and `/delete` accept.
pub fn format_roster(
    roster: &[SessionSummary],
    active: Option<&SessionId>,
    notices: &NoticeSettings,
) -> String {
    if roster.is_empty() {
        return "  (no sessions)\n".to_string();
    }
    let mut out = String::new();
    for (i, entry) in roster.iter().enumerate() {
        let marker = if active == Some(&entry.session_id) { '*' } else { ' ' };
        let _ = write!(
            out,
            "{marker} {:>2}. {}  ({})",
            i + 1,
            entry.display_title(&notices.untitled),
            entry.session_id
        );
        if entry.is_terminal {
            out.push_str("  [완료]");
        }
        out.push('\n');
    }
    out
}

/// Prints what changed since the previous snapshot.
pub struct TerminalPresenter<W> {
    out: W,
    last: Option<ChatState>,
    last_loading: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: None,
            last_loading: false,
        }
    }

    fn changes(&self, view: &StoreView<'_>) -> String {
        let state = view.state;
        let previous = self.last.as_ref();
        let before = previous.map(ChatState::messages).unwrap_or_default();
        let common = before
            .iter()
            .zip(state.messages())
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = String::new();
        if common == 0 && !before.is_empty() && !self.last_loading {
            match view.active {
                Some(id) => {
                    let _ = writeln!(out, "\n──── {id} ────");
                }
                None => out.push_str("\n────────────\n"),
            }
        }
        for message in &state.messages()[common..] {
            let _ = writeln!(out, "{}", format_message(message));
        }

        let issues_changed = previous.is_none_or(|p| {
            p.issues() != state.issues()
                || p.progress() != state.progress()
                || p.checklist() != state.checklist()
                || p.current_step() != state.current_step()
        });
        if issues_changed && !state.issues().is_empty() {
            out.push_str(&format_issues(state, view.notices));
        }
        out
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render(&mut self, view: &StoreView<'_>) {
        let changes = self.changes(view);
        if !changes.is_empty() {
            let written = self
                .out
                .write_all(changes.as_bytes())
                .and_then(|()| self.out.flush());
            if let Err(e) = written {
                debug!("terminal write failed: {e}");
            }
        }
        self.last = Some(view.state.clone());
        self.last_loading = view.loading;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::testing::{checklist, summary};
    use counsel_core::{ChecklistPayload, IssueRef, StreamEvent};

    fn view<'a>(state: &'a ChatState, notices: &'a NoticeSettings) -> StoreView<'a> {
        StoreView {
            active: None,
            roster: &[],
            state,
            loading: false,
            notices,
        }
    }

    fn checklist_payload(event: StreamEvent) -> ChecklistPayload {
        match event {
            StreamEvent::ChecklistUpdate(payload) => payload,
            other => panic!("not a checklist update: {other:?}"),
        }
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0), "░".repeat(20));
        assert_eq!(progress_bar(40), format!("{}{}", "█".repeat(8), "░".repeat(12)));
        assert_eq!(progress_bar(100), "█".repeat(20));
    }

    #[test]
    fn checklist_icons() {
        assert_eq!(status_icon(ChecklistStatus::Yes), '✓');
        assert_eq!(status_icon(ChecklistStatus::No), '✕');
        assert_eq!(status_icon(ChecklistStatus::Pending), '○');
    }

    #[test]
    fn conclusion_and_notice_markers() {
        let mut reply = Message::ai("최종 정리입니다.\n두 번째 줄");
        assert_eq!(format_message(&reply), "상담 › 최종 정리입니다.\n     두 번째 줄");
        reply.is_terminal_conclusion = true;
        assert!(format_message(&reply).starts_with("상담 ★ "));
        assert_eq!(format_message(&Message::notice("오류: x")), "  ! 오류: x");
    }

    #[test]
    fn issues_show_label_bar_and_items() {
        let notices = NoticeSettings::default();
        let mut state = ChatState::new();
        assert_eq!(format_issues(&state, &notices), "  [이슈 감지 중...]\n");

        let mut payload = checklist_payload(checklist(
            "wage_arrears",
            40,
            &[("근무 기록", ChecklistStatus::Yes), ("퇴사일", ChecklistStatus::Pending)],
        ));
        payload.detected_issues = vec![IssueRef::Labeled {
            key: "wage_arrears".into(),
            label: Some("임금 체불".into()),
        }];
        state.apply_checklist(payload);

        let text = format_issues(&state, &notices);
        assert!(text.contains("[임금 체불]"));
        assert!(text.contains(" 40%"));
        assert!(text.contains("✓ 근무 기록"));
        assert!(text.contains("○ 퇴사일"));
    }

    #[test]
    fn roster_marks_active_and_untitled() {
        let notices = NoticeSettings::default();
        let mut untitled = summary("s-2", "");
        untitled.is_terminal = true;
        let roster = vec![summary("s-1", "임금 문의"), untitled];

        let text = format_roster(&roster, Some(&SessionId::new("s-2")), &notices);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "   1. 임금 문의  (s-1)");
        assert_eq!(lines[1], "*  2. 새 상담  (s-2)  [완료]");
    }

    #[test]
    fn presenter_prints_only_new_messages() {
        let notices = NoticeSettings::default();
        let mut presenter = TerminalPresenter::new(Vec::new());

        let mut state = ChatState::greeting(&notices.greeting);
        presenter.render(&view(&state, &notices));
        state.push(Message::user("질문"));
        state.push(Message::pending(&notices.pending));
        presenter.render(&view(&state, &notices));
        state.remove_pending();
        state.push(Message::ai("답변"));
        presenter.render(&view(&state, &notices));

        let printed = String::from_utf8(presenter.out).expect("utf8");
        assert_eq!(printed.matches(&notices.greeting).count(), 1);
        assert_eq!(printed.matches("나 › 질문").count(), 1);
        assert!(printed.contains("  … 분석 중..."));
        assert!(printed.ends_with("상담 › 답변\n"));
        assert!(!printed.contains("────"));
    }

    #[test]
    fn presenter_separates_a_different_conversation() {
        let notices = NoticeSettings::default();
        let mut presenter = TerminalPresenter::new(Vec::new());

        let first = ChatState::greeting(&notices.greeting);
        presenter.render(&view(&first, &notices));
        let mut other = ChatState::new();
        other.push(Message::user("다른 질문"));
        presenter.render(&view(&other, &notices));

        let printed = String::from_utf8(presenter.out).expect("utf8");
        assert!(printed.contains("────────────"));
        assert!(printed.ends_with("나 › 다른 질문\n"));
    }
}
