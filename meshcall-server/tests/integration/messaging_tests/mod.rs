mod test_caption_fanout;
mod test_chat_history;
mod test_signal_forwarding;
