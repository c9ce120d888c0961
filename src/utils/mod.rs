//! # ماژول توابع کمکی (Utilities)
//!
//! تبدیل ارقام فارسی/عربی، اعتبارسنجی شماره موبایل، تولید کد عددی تصادفی
//! و چند تابع کوچک برای کار با متن.
//!
//! ## مفاهیم Rust:
//! - **char ranges**: pattern matching روی بازه‌ی کاراکترها
//! - **Iterator**: `map` و `collect` برای ساخت String
//! - **once_cell::Lazy**: کامپایل Regex فقط یک بار
//! - **Option**: برگردوندن `None` به جای خطا برای ورودی نامعتبر

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

// =====================================
// Constants
// =====================================
/// ارقام فارسی (U+06F0 تا U+06F9)
pub const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// ارقام عربی (U+0660 تا U+0669)
pub const ARABIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// طول پیش‌فرض کد یکبار مصرف
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// الگوی شماره موبایل نرمال‌شده ایران
pub static VALID_MOBILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^09\d{9}$").expect("Invalid regex pattern")
});

/// الگوی کد یکبار مصرف (فقط ارقام انگلیسی)
pub static VALID_OTP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4,10}$").expect("Invalid regex pattern")
});

// =====================================
// Digit Normalization
// =====================================
/// تبدیل ارقام فارسی و عربی به ارقام انگلیسی
///
/// بقیه‌ی کاراکترها دست نمیخورن.
///
/// # مثال
/// ```rust
/// use shop_backend::utils::normalize_digits;
///
/// assert_eq!(normalize_digits("۰۹۱۲-٣٤٥"), "0912-345");
/// ```
#[must_use]
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '۰'..='۹' => char::from_digit(c as u32 - '۰' as u32, 10).unwrap_or(c),
            '٠'..='٩' => char::from_digit(c as u32 - '٠' as u32, 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// تبدیل ارقام انگلیسی به فارسی (برای متن پیامک و نمایش)
///
/// # مثال
/// ```rust
/// use shop_backend::utils::to_persian_digits;
///
/// assert_eq!(to_persian_digits("کد: 1234"), "کد: ۱۲۳۴");
/// ```
#[must_use]
pub fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                PERSIAN_DIGITS[(c as u8 - b'0') as usize]
            } else {
                c
            }
        })
        .collect()
}

// =====================================
// Phone Numbers
// =====================================
/// نرمال‌سازی شماره موبایل به فرمت `09xxxxxxxxx`
///
/// # فرمت‌های قابل قبول:
/// - `09123456789`
/// - `9123456789`
/// - `+989123456789` و `00989123456789` و `989123456789`
/// - با فاصله، خط تیره یا پرانتز
/// - با ارقام فارسی یا عربی
///
/// اگه شماره معتبر نباشه `None` برمیگردونه.
///
/// # مثال
/// ```rust
/// use shop_backend::utils::normalize_phone;
///
/// assert_eq!(normalize_phone("+98 912 345 6789").as_deref(), Some("09123456789"));
/// assert_eq!(normalize_phone("۰۹۱۲۳۴۵۶۷۸۹").as_deref(), Some("09123456789"));
/// assert_eq!(normalize_phone("12345"), None);
/// ```
#[must_use]
pub fn normalize_phone(input: &str) -> Option<String> {
    let digits: String = normalize_digits(input.trim())
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let national = if let Some(rest) = digits.strip_prefix("+98") {
        rest
    } else if let Some(rest) = digits.strip_prefix("0098") {
        rest
    } else if digits.len() == 12 && digits.starts_with("98") {
        &digits[2..]
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        &digits
    };

    let candidate = format!("0{national}");
    VALID_MOBILE.is_match(&candidate).then_some(candidate)
}

/// آیا ورودی یه شماره موبایل معتبره؟
#[must_use]
pub fn is_valid_phone(input: &str) -> bool {
    normalize_phone(input).is_some()
}

/// نرمال‌سازی کد یکبار مصرف وارد شده توسط کاربر
///
/// ارقام فارسی تبدیل و فاصله‌ها حذف میشن.
#[must_use]
pub fn normalize_otp(input: &str) -> Option<String> {
    let code: String = normalize_digits(input)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    VALID_OTP.is_match(&code).then_some(code)
}

// =====================================
// Random Codes
// =====================================
/// تولید رشته‌ای از ارقام تصادفی
///
/// # مفاهیم:
/// - `rand::thread_rng()`: تولیدکننده اعداد تصادفی برای این thread
/// - رقم اول هم میتونه صفر باشه، پس خروجی رو به عدد تبدیل نکنید
///
/// # مثال
/// ```rust
/// use shop_backend::utils::random_digits;
///
/// let code = random_digits(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_digit()));
/// ```
#[must_use]
pub fn random_digits(length: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

// =====================================
// String Utilities
// =====================================
/// خلاصه کردن متن طولانی
///
/// # مثال
/// ```rust
/// use shop_backend::utils::truncate;
///
/// let text = "Hello, World!";
/// assert_eq!(truncate(text, Some(8)), "Hello...");
/// ```
#[must_use]
pub fn truncate(text: &str, max_len: Option<usize>) -> String {
    let max = max_len.unwrap_or(100);

    if text.chars().count() <= max {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max.saturating_sub(3)).collect();

    format!("{}...", truncated)
}

/// تمیز کردن whitespace‌های اضافی
#[must_use]
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Mask کردن بخشی از متن (برای لاگ‌ها)
///
/// # مثال
/// ```rust
/// use shop_backend::utils::mask_string;
///
/// assert_eq!(mask_string("secret123", 3), "sec***");
/// ```
#[must_use]
pub fn mask_string(text: &str, visible_chars: usize) -> String {
    if text.chars().count() <= visible_chars {
        return "*".repeat(text.chars().count());
    }

    let visible: String = text.chars().take(visible_chars).collect();
    format!("{}***", visible)
}

/// Mask کردن شماره موبایل برای لاگ: `0912***6789`
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 8 {
        return mask_string(phone, 2);
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_digits() {
        assert_eq!(normalize_digits("۱۲۳۴۵۶۷۸۹۰"), "1234567890");
        assert_eq!(normalize_digits("٠١٢٣٤٥٦٧٨٩"), "0123456789");
        assert_eq!(normalize_digits("abc ۱ def"), "abc 1 def");
        assert_eq!(normalize_digits(""), "");
    }

    #[test]
    fn test_to_persian_digits() {
        assert_eq!(to_persian_digits("0912"), "۰۹۱۲");
        assert_eq!(to_persian_digits("price: 15000"), "price: ۱۵۰۰۰");
    }

    #[test]
    fn test_normalize_phone_formats() {
        for input in [
            "09123456789",
            "9123456789",
            "+989123456789",
            "00989123456789",
            "989123456789",
            "0912 345 6789",
            "0912-345-6789",
            "۰۹۱۲۳۴۵۶۷۸۹",
            "٠٩١٢٣٤٥٦٧٨٩",
        ] {
            assert_eq!(normalize_phone(input).as_deref(), Some("09123456789"), "{input}");
        }
    }

    #[test]
    fn test_invalid_phones() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("0212345678"), None); // تلفن ثابت
        assert_eq!(normalize_phone("0912345678"), None); // کوتاه
        assert_eq!(normalize_phone("091234567890"), None); // بلند
        assert_eq!(normalize_phone("0912abc6789"), None);
        assert!(!is_valid_phone("+1 555 123 4567"));
    }

    #[test]
    fn test_normalize_otp() {
        assert_eq!(normalize_otp("۱۲۳۴۵۶").as_deref(), Some("123456"));
        assert_eq!(normalize_otp(" 12 34 ").as_deref(), Some("1234"));
        assert_eq!(normalize_otp("12a4"), None);
        assert_eq!(normalize_otp("12"), None);
    }

    #[test]
    fn test_random_digits() {
        for len in [0, 4, 6, 10] {
            let code = random_digits(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", Some(10)), "short");
        assert_eq!(truncate("this is a long text", Some(10)), "this is...");
        assert_eq!(truncate("سلام دنیا خوبی", Some(7)), "سلام...");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask_string("secret123", 3), "sec***");
        assert_eq!(mask_string("ab", 5), "**");
        assert_eq!(mask_phone("09123456789"), "0912***6789");
        assert_eq!(mask_phone("0912"), "09***");
    }
}
