//! 回复文案

use sgroupbot_solitaire::{HitCount, Outcome, Started, Verdict};

/// 开始或继续游戏
pub const START_COMMAND: &str = "成语接龙";
/// 退出并结算
pub const EXIT_COMMAND: &str = "退出";

/// 结算排行最多展示的人数
const RANKING_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Exit,
    Answer(&'a str),
}

impl<'a> Command<'a> {
    /// 去掉首尾空白后精确匹配命令，其余内容都视为作答
    pub fn parse(content: &'a str) -> Self {
        match content.trim() {
            START_COMMAND => Command::Start,
            EXIT_COMMAND => Command::Exit,
            answer => Command::Answer(answer),
        }
    }
}

pub fn started(started: &Started) -> String {
    if started.resumed {
        format!("成语接龙正在进行中，想想这个成语怎么接，{}", started.phrase)
    } else {
        format!("成语接龙开始了哦，想想这个成语怎么接，{}", started.phrase)
    }
}

pub fn exited(ranking: &[HitCount]) -> String {
    with_ranking("成语接龙已结束".to_string(), ranking)
}

pub fn verdict(verdict: &Verdict) -> String {
    let text = match &verdict.outcome {
        Outcome::Failed | Outcome::Stalled => "不是这个词哦，再想想".to_string(),
        Outcome::FailedToNext { next } => format!("还是不对哦，让我告诉你吧，{}", next),
        Outcome::Succeed { next } => format!("你答对了，我接这个词，{}", next),
        Outcome::End => "你真厉害，我接不上来了，接龙结束".to_string(),
        Outcome::Completed => "你真厉害，全部完成了哦".to_string(),
        Outcome::FailedAndCompleted { next } => {
            format!("接龙结束了，最后一个词可以接这个，{}", next)
        }
        Outcome::Timeout => "成语接龙已超时结束".to_string(),
        Outcome::Canceled => "成语接龙已结束".to_string(),
    };

    if verdict.outcome.is_settlement() {
        with_ranking(text, &verdict.ranking)
    } else {
        text
    }
}

/// 没有人答对时不附加排行
fn with_ranking(mut text: String, ranking: &[HitCount]) -> String {
    let scored: Vec<&HitCount> = ranking
        .iter()
        .filter(|hit| hit.count > 0)
        .take(RANKING_SIZE)
        .collect();
    if scored.is_empty() {
        return text;
    }

    text.push_str("\n接龙排行\n");
    for hit in scored {
        text.push_str(&format!("{} {}\n", hit.participant, hit.count));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(participant: &str, count: u32) -> HitCount {
        HitCount {
            participant: participant.to_string(),
            count,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(" 成语接龙 "), Command::Start);
        assert_eq!(Command::parse("退出\n"), Command::Exit);
        assert_eq!(Command::parse(" 意气风发"), Command::Answer("意气风发"));
        assert_eq!(Command::parse("成语接龙吧"), Command::Answer("成语接龙吧"));
    }

    #[test]
    fn test_start_texts() {
        let fresh = Started {
            phrase: "一心一意".to_string(),
            resumed: false,
        };
        assert_eq!(started(&fresh), "成语接龙开始了哦，想想这个成语怎么接，一心一意");

        let resumed = Started {
            resumed: true,
            ..fresh
        };
        assert_eq!(started(&resumed), "成语接龙正在进行中，想想这个成语怎么接，一心一意");
    }

    #[test]
    fn test_settlement_appends_top_three() {
        let text = verdict(&Verdict {
            outcome: Outcome::Completed,
            ranking: vec![hit("B", 5), hit("C", 5), hit("A", 2), hit("D", 1)],
        });
        assert_eq!(text, "你真厉害，全部完成了哦\n接龙排行\nB 5\nC 5\nA 2\n");
    }

    #[test]
    fn test_non_settlement_has_no_ranking() {
        let text = verdict(&Verdict {
            outcome: Outcome::Succeed {
                next: "发愤图强".to_string(),
            },
            ranking: vec![hit("A", 1)],
        });
        assert_eq!(text, "你答对了，我接这个词，发愤图强");

        assert_eq!(
            verdict(&Verdict {
                outcome: Outcome::Stalled,
                ranking: Vec::new(),
            }),
            "不是这个词哦，再想想"
        );
    }

    #[test]
    fn test_timeout_settles_with_ranking() {
        let text = verdict(&Verdict {
            outcome: Outcome::Timeout,
            ranking: vec![hit("alice", 1)],
        });
        assert_eq!(text, "成语接龙已超时结束\n接龙排行\nalice 1\n");
    }

    #[test]
    fn test_empty_ranking_is_omitted() {
        let text = verdict(&Verdict {
            outcome: Outcome::FailedAndCompleted {
                next: "强人所难".to_string(),
            },
            ranking: Vec::new(),
        });
        assert_eq!(text, "接龙结束了，最后一个词可以接这个，强人所难");
        assert_eq!(exited(&[]), "成语接龙已结束");
        assert_eq!(exited(&[hit("A", 2)]), "成语接龙已结束\n接龙排行\nA 2\n");
    }
}
