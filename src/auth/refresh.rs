//! 401 응답 처리 상태 머신
//!
//! 원 요청 하나마다 `Normal`에서 시작합니다. 401을 받으면 refresh 토큰으로
//! 한 번만 갱신을 시도하고, 성공하면 원 요청을 한 번만 재전송합니다.
//! 재전송도 401이거나 갱신이 실패하면 `Failed`로 끝나며, 이후 이벤트는
//! 어떤 동작도 만들지 않습니다.

/// 요청별 갱신 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Normal,
    Refreshing,
    Retrying,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// 서버가 401을 반환
    Unauthorized { has_refresh_token: bool },
    RefreshSucceeded,
    RefreshFailed,
}

/// 상태 전이 결과로 클라이언트가 수행할 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshAction {
    /// refresh 엔드포인트 호출
    StartRefresh,
    /// 새 토큰으로 원 요청 재전송
    RetryRequest,
    /// 토큰 삭제 + 로그인 화면 이동
    GiveUp,
    Nothing,
}

impl RefreshState {
    pub fn next(self, event: RefreshEvent) -> (RefreshState, RefreshAction) {
        use RefreshAction::*;
        use RefreshState::*;

        match (self, event) {
            (Normal, RefreshEvent::Unauthorized { has_refresh_token: true }) => {
                (Refreshing, StartRefresh)
            }
            (Normal, RefreshEvent::Unauthorized { has_refresh_token: false }) => (Failed, GiveUp),
            (Refreshing, RefreshEvent::RefreshSucceeded) => (Retrying, RetryRequest),
            (Refreshing, RefreshEvent::RefreshFailed) => (Failed, GiveUp),
            // 재전송 요청도 401이면 다시 갱신하지 않음
            (Retrying, RefreshEvent::Unauthorized { .. }) => (Failed, GiveUp),
            (Failed, _) => (Failed, Nothing),
            (state, _) => (state, Nothing),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RefreshState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[RefreshEvent]) -> (RefreshState, Vec<RefreshAction>) {
        let mut state = RefreshState::Normal;
        let mut actions = Vec::new();
        for event in events {
            let (next, action) = state.next(*event);
            state = next;
            actions.push(action);
        }
        (state, actions)
    }

    #[test]
    fn test_refresh_then_retry_succeeds_once() {
        let (state, actions) = run(&[
            RefreshEvent::Unauthorized { has_refresh_token: true },
            RefreshEvent::RefreshSucceeded,
        ]);
        assert_eq!(state, RefreshState::Retrying);
        assert_eq!(actions, vec![RefreshAction::StartRefresh, RefreshAction::RetryRequest]);
    }

    #[test]
    fn test_second_unauthorized_never_refreshes_again() {
        let (state, actions) = run(&[
            RefreshEvent::Unauthorized { has_refresh_token: true },
            RefreshEvent::RefreshSucceeded,
            RefreshEvent::Unauthorized { has_refresh_token: true },
            RefreshEvent::Unauthorized { has_refresh_token: true },
        ]);
        assert!(state.is_terminal());
        let refreshes = actions.iter().filter(|a| **a == RefreshAction::StartRefresh).count();
        let give_ups = actions.iter().filter(|a| **a == RefreshAction::GiveUp).count();
        assert_eq!(refreshes, 1);
        assert_eq!(give_ups, 1);
    }

    #[test]
    fn test_failed_refresh_gives_up_exactly_once() {
        let (state, actions) = run(&[
            RefreshEvent::Unauthorized { has_refresh_token: true },
            RefreshEvent::RefreshFailed,
            RefreshEvent::RefreshFailed,
        ]);
        assert_eq!(state, RefreshState::Failed);
        assert_eq!(
            actions,
            vec![RefreshAction::StartRefresh, RefreshAction::GiveUp, RefreshAction::Nothing]
        );
    }

    #[test]
    fn test_missing_refresh_token_gives_up_immediately() {
        let (state, actions) = run(&[RefreshEvent::Unauthorized { has_refresh_token: false }]);
        assert_eq!(state, RefreshState::Failed);
        assert_eq!(actions, vec![RefreshAction::GiveUp]);
    }
}
