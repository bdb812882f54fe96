/// A company's quiet-hours window in local wall-clock minutes.
///
/// Built from the optional "HH:MM" start/end strings stored on the company
/// row. Absent or malformed strings leave the window unconfigured, which
/// evaluates to "not quiet": a typo in settings must degrade to sending,
/// never to silently suppressing.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietHours {
    window: Option<(u32, u32)>,
}

fn minute_of_day(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

impl QuietHours {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        let window = match (start, end) {
            (Some(s), Some(e)) => minute_of_day(s).zip(minute_of_day(e)),
            _ => None,
        };
        Self { window }
    }

    pub fn is_configured(&self) -> bool {
        self.window.is_some()
    }

    /// Whether the local time "HH:MM" falls inside the window.
    ///
    /// Start is inclusive, end exclusive. A window whose start is after its
    /// end crosses midnight: 21:00-07:00 contains 23:30 and 01:00 but not
    /// 08:00.
    pub fn contains_hhmm(&self, now_hhmm: &str) -> bool {
        let Some((start, end)) = self.window else {
            return false;
        };
        let Some(now) = minute_of_day(now_hhmm) else {
            return false;
        };
        if start <= end {
            now >= start && now < end
        } else {
            now >= start || now < end
        }
    }
}
