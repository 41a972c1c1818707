use serde::Deserialize;
use std::collections::VecDeque;

use crate::oss::{ObjectMeta, ObjectStoreError};

/// 列举结果中的一页
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    #[serde(default)]
    pub items: Vec<ObjectMeta>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    Start,
    Paging,
    Done,
}

/// 按页拉取对象的惰性迭代器
///
/// 当前页耗尽后用 continuation token 请求下一页，直到后端不再返回 token。
/// 请求失败时产出一次错误并结束迭代
pub struct ObjectPager<F> {
    fetch: F,
    buffer: VecDeque<ObjectMeta>,
    next_token: Option<String>,
    state: PagerState,
}

impl<F> ObjectPager<F>
where
    F: FnMut(Option<&str>) -> Result<ObjectPage, ObjectStoreError>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            buffer: VecDeque::new(),
            next_token: None,
            state: PagerState::Start,
        }
    }
}

impl<F> Iterator for ObjectPager<F>
where
    F: FnMut(Option<&str>) -> Result<ObjectPage, ObjectStoreError>,
{
    type Item = Result<ObjectMeta, ObjectStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let token = match self.state {
                PagerState::Done => return None,
                PagerState::Start => None,
                PagerState::Paging => match self.next_token.take() {
                    Some(token) => Some(token),
                    None => {
                        self.state = PagerState::Done;
                        return None;
                    }
                },
            };

            match (self.fetch)(token.as_deref()) {
                Ok(page) => {
                    self.buffer.extend(page.items);
                    self.next_token = page.next_page_token.filter(|t| !t.is_empty());
                    self.state = PagerState::Paging;
                }
                Err(err) => {
                    self.state = PagerState::Done;
                    return Some(Err(err));
                }
            }
        }
    }
}
